fn main() {
    if let Err(err) = trashcan::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
