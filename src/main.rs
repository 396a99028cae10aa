fn main() -> anyhow::Result<()> {
    flower_classifier_lib::run()
}
