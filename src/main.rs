fn main() {
    if let Err(err) = county_patterns::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
