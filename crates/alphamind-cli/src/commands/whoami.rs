use alphamind_core::identity;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", identity::resolve_default()?);
    Ok(())
}
