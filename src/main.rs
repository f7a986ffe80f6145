fn main() -> Result<(), Box<dyn std::error::Error>> {
    sagechat::cli::main()
}
