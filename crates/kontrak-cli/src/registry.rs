//! `kontrak registry`.

use std::collections::BTreeMap;

use kontrak_client::{OperationMode, OperationRegistry};

use crate::output::print_json;

pub fn run(registry: &OperationRegistry) -> anyhow::Result<()> {
    print_json(&catalog(registry))
}

fn catalog(registry: &OperationRegistry) -> BTreeMap<&str, Vec<OperationMode>> {
    registry
        .entities()
        .map(|entity| (entity, registry.modes(entity).collect()))
        .collect()
}
