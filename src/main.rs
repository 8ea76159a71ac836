fn main() {
    pegine::cli::run();
}
