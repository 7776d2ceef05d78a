fn main() {
    pretty_env_logger::init_custom_env("RUST_LOG");
    if let Err(err) = kaart_rs_renderer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
