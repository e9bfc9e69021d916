fn main() {
    if let Err(err) = todokeep::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
