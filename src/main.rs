fn main() -> anyhow::Result<()> {
    powerbench::run()
}
