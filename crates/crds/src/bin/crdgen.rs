//! Prints the CRD manifests for all DCops DHCP resources as a multi-document YAML stream.

use crds::{Endpoint, IPReservation};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    for crd in [Endpoint::crd(), IPReservation::crd()] {
        print!("---\n{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
