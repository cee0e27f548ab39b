fn main() {
    let code = node_ci::run_cli();
    if code != 0 {
        std::process::exit(code);
    }
}
