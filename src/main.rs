fn main() {
    if let Err(err) = desklamp_lib::run() {
        eprintln!("desklamp-host: {err:#}");
        std::process::exit(1);
    }
}
