//! Prints the Install CRD as YAML.
//!
//! ```bash
//! cargo run -p crds --bin crdgen > deploy/crds/install.yaml
//! ```

use crds::Install;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Install::crd())?);
    Ok(())
}
