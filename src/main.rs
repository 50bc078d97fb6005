fn main() {
    std::process::exit(perfreview::app::run());
}
