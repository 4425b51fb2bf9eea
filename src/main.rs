fn main() {
    if let Err(err) = cfgview::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
