fn main() {
    if let Err(err) = ucode::driver::run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
