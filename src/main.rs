fn main() -> anyhow::Result<()> {
    organizer::cli::run()
}
