use collagist::cli::Cli;

fn main() {
    Cli::run();
}
