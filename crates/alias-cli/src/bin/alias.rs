fn main() -> alias_cli::Result<()> {
    alias_cli::run()
}
