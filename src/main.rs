use mesh_interference::frontend::cli::cli;


fn main() {
    if let Err(error) = cli() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
