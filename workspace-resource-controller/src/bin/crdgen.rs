//! Prints the CustomResourceDefinitions installed by this project
fn main() -> anyhow::Result<()> {
    print!("{}", workspace_resource_controller::crd::crds_yaml()?);
    Ok(())
}
