fn main() {
    mailfist::uci::run();
}
