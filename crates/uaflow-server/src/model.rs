//! Vendor model built into every server instance.
//!
//! Layout under `Objects`:
//!
//! ```text
//! VendorName
//! ├── Equipment           (dynamic equipment nodes)
//! ├── Physical Assets     (dynamic physical-asset nodes)
//! ├── MyVariable2         writable Double
//! ├── FreeMemory          available host memory, percent
//! ├── Counter             value pushed by variable-update messages
//! └── Bark(nbBarks, volume) -> Barks
//! ```

use sysinfo::System;
use tracing::{debug, info, warn};
use uaflow_core::{Argument, DataType, NodeId, ReferenceType, StatusCode, Variant};
use uaflow_graph::{
    AddressSpace, CallResult, GraphError, MethodHandler, SharedValue, VariableBinding,
};

/// Namespace of every vendor node.
pub const NAMESPACE: u16 = 4;

/// Upper bound on `nbBarks`.
pub const MAX_BARKS: u32 = 1000;

/// Upper bound on `volume`.
pub const MAX_VOLUME: u32 = 100;

pub fn vendor_name() -> NodeId {
    NodeId::string(NAMESPACE, "VendorName")
}

pub fn equipment() -> NodeId {
    NodeId::string(NAMESPACE, "Equipment")
}

pub fn physical_assets() -> NodeId {
    NodeId::string(NAMESPACE, "PhysicalAssets")
}

pub fn my_variable2() -> NodeId {
    NodeId::string(NAMESPACE, "MyVariable2")
}

pub fn free_memory() -> NodeId {
    NodeId::string(NAMESPACE, "FreeMemory")
}

pub fn counter() -> NodeId {
    NodeId::string(NAMESPACE, "Counter")
}

/// A category of nodes that can be added at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicCategory {
    Equipment,
    PhysicalAsset,
}

impl DynamicCategory {
    /// The folder new nodes are organized under.
    pub fn parent(self) -> NodeId {
        match self {
            Self::Equipment => equipment(),
            Self::PhysicalAsset => physical_assets(),
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Self::Equipment => "Equipment",
            Self::PhysicalAsset => "PhysicalAssets",
        }
    }
}

/// Process values that outlive a single server instance.
#[derive(Debug, Clone)]
pub struct ProcessValues {
    /// Backs the `Counter` variable.
    pub counter: SharedValue,
}

impl Default for ProcessValues {
    fn default() -> Self {
        Self {
            counter: SharedValue::new(0.0),
        }
    }
}

/// Per-instance vendor state: the dynamic-node counters.
///
/// Counters start at zero with every new instance and only grow.
#[derive(Debug, Default)]
pub struct VendorModel {
    equipment_counter: u32,
    physical_asset_counter: u32,
}

impl VendorModel {
    /// Adds the vendor nodes to a freshly built address space.
    pub fn construct(space: &mut AddressSpace, values: &ProcessValues) -> Result<Self, GraphError> {
        let vendor = vendor_name();

        info!("Adding VendorName");
        space.add_object(&NodeId::OBJECTS_FOLDER, vendor.clone(), "VendorName")?;
        space.add_object(&vendor, equipment(), "Equipment")?;
        space.add_object(&vendor, physical_assets(), "Physical Assets")?;

        debug!("Adding MyVariable2");
        space.add_variable(
            &vendor,
            my_variable2(),
            "MyVariable2",
            DataType::Double,
            VariableBinding::stored(SharedValue::new(10.0)),
        )?;

        debug!("Adding FreeMemory");
        space.add_variable(
            &vendor,
            free_memory(),
            "FreeMemory",
            DataType::Double,
            VariableBinding::read_only(|| Variant::Double(available_memory_percent())),
        )?;

        debug!("Adding Counter");
        space.add_variable(
            &vendor,
            counter(),
            "Counter",
            DataType::Double,
            VariableBinding::observe(values.counter.clone()),
        )?;

        debug!("Adding Bark");
        space.add_method(
            &vendor,
            "Bark",
            vec![
                Argument::scalar("nbBarks", DataType::UInt32)
                    .with_description("specifies the number of time I should bark"),
                Argument::scalar("volume", DataType::UInt32)
                    .with_description("specifies the sound volume [0 = quiet ,100 = loud]"),
            ],
            vec![Argument::array("Barks", DataType::String).with_description("the generated barks")],
            MethodHandler::sync(bark),
        )?;

        Ok(Self::default())
    }

    /// Checks that Equipment is still organized by VendorName.
    pub fn verify_placement(space: &AddressSpace) -> bool {
        let found = space
            .find_references(&vendor_name(), ReferenceType::Organizes, true)
            .iter()
            .any(|r| r.target == equipment());
        if found {
            info!("Equipment reference found in VendorName");
        } else {
            warn!("Equipment reference not found in VendorName");
        }
        found
    }

    /// Adds a dynamic node and returns its id.
    ///
    /// The browse name is `<name><n>`; the id is
    /// `ns=4;s=<Prefix>.<n>.<name>` (`Equipment.1.Pump`,
    /// `PhysicalAssets.1.Pump`), which is what `deleteNode` expects. The
    /// counter advances even when the parent is gone, so a suffix is never
    /// handed out twice.
    pub fn add(
        &mut self,
        space: &mut AddressSpace,
        category: DynamicCategory,
        node_name: &str,
    ) -> Result<NodeId, GraphError> {
        let counter = match category {
            DynamicCategory::Equipment => &mut self.equipment_counter,
            DynamicCategory::PhysicalAsset => &mut self.physical_asset_counter,
        };
        *counter += 1;

        let browse_name = format!("{}{}", node_name, counter);
        let node_id = NodeId::string(
            NAMESPACE,
            format!("{}.{}.{}", category.id_prefix(), counter, node_name),
        );

        space.add_object(&category.parent(), node_id.clone(), browse_name)?;
        Ok(node_id)
    }

    pub fn equipment_counter(&self) -> u32 {
        self.equipment_counter
    }

    pub fn physical_asset_counter(&self) -> u32 {
        self.physical_asset_counter
    }
}

/// Available over total host memory, in percent.
fn available_memory_percent() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    if total == 0 {
        return 0.0;
    }
    sys.available_memory() as f64 / total as f64 * 100.0
}

fn bark(inputs: &[Variant]) -> CallResult {
    let [Variant::UInt32(nb_barks), Variant::UInt32(volume)] = inputs else {
        return CallResult::bad(StatusCode::BadTypeMismatch);
    };
    if *nb_barks > MAX_BARKS || *volume > MAX_VOLUME {
        return CallResult::bad(StatusCode::BadOutOfRange);
    }
    debug!("Barking {} times at volume {}", nb_barks, volume);

    let sound = format!("Whaff{}", "!".repeat(volume.saturating_sub(1) as usize));
    let barks = (0..*nb_barks).map(|_| Variant::String(sound.clone())).collect();
    CallResult::good(vec![Variant::Array(barks)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uaflow_core::NodeClass;
    use uaflow_graph::AddressSpaceBuilder;

    fn built() -> (AddressSpace, VendorModel, ProcessValues) {
        let mut space = AddressSpaceBuilder::new().build().unwrap();
        let values = ProcessValues::default();
        let model = VendorModel::construct(&mut space, &values).unwrap();
        (space, model, values)
    }

    fn bark_method(space: &AddressSpace) -> NodeId {
        space
            .find_by_name("Bark")
            .first()
            .map(|n| n.node_id.clone())
            .unwrap()
    }

    #[test]
    fn test_vendor_layout() {
        let (space, _, _) = built();
        assert!(VendorModel::verify_placement(&space));
        assert_eq!(
            space.parent_of(&vendor_name()).map(|r| r.source),
            Some(NodeId::OBJECTS_FOLDER)
        );
        assert_eq!(
            space.find_node(&physical_assets()).map(|n| n.browse_name.as_str()),
            Some("Physical Assets")
        );
        let bark = bark_method(&space);
        assert_eq!(bark.namespace, NAMESPACE);
        assert_eq!(space.find_node(&bark).unwrap().node_class(), NodeClass::Method);
    }

    #[test]
    fn test_my_variable2_rejects_non_numeric_writes() {
        let (space, _, _) = built();
        assert_eq!(space.read_value(&my_variable2()), Ok(Variant::Double(10.0)));

        assert_eq!(
            space.write_value(&my_variable2(), &Variant::from("abc")),
            StatusCode::BadTypeMismatch
        );
        assert_eq!(space.read_value(&my_variable2()), Ok(Variant::Double(10.0)));

        assert_eq!(
            space.write_value(&my_variable2(), &Variant::Double(42.5)),
            StatusCode::Good
        );
        assert_eq!(space.read_value(&my_variable2()), Ok(Variant::Double(42.5)));
    }

    #[test]
    fn test_read_only_variables() {
        let (space, _, values) = built();
        assert_eq!(
            space.write_value(&free_memory(), &Variant::Double(1.0)),
            StatusCode::BadNotWritable
        );
        let free = space.read_value(&free_memory()).unwrap().to_f64().unwrap();
        assert!((0.0..=100.0).contains(&free));

        values.counter.set(7.0);
        assert_eq!(space.read_value(&counter()), Ok(Variant::Double(7.0)));
        assert_eq!(
            space.write_value(&counter(), &Variant::Double(1.0)),
            StatusCode::BadNotWritable
        );
    }

    #[tokio::test]
    async fn test_bark_quiet() {
        let (space, _, _) = built();
        let call = space
            .prepare_call(&bark_method(&space), &[Variant::UInt32(3), Variant::UInt32(0)])
            .unwrap();
        let result = call.invoke().await;
        assert_eq!(result.status_code, StatusCode::Good);
        assert_eq!(
            result.output_arguments,
            vec![Variant::Array(vec![Variant::from("Whaff"); 3])]
        );
    }

    #[tokio::test]
    async fn test_bark_loud_and_out_of_range() {
        let (space, _, _) = built();
        let bark = bark_method(&space);

        let loud = space
            .prepare_call(&bark, &[Variant::UInt32(1), Variant::UInt32(4)])
            .unwrap()
            .invoke()
            .await;
        assert_eq!(
            loud.output_arguments,
            vec![Variant::Array(vec![Variant::from("Whaff!!!")])]
        );

        let too_loud = space
            .prepare_call(&bark, &[Variant::UInt32(1), Variant::UInt32(MAX_VOLUME + 1)])
            .unwrap()
            .invoke()
            .await;
        assert_eq!(too_loud.status_code, StatusCode::BadOutOfRange);

        assert_eq!(
            space.prepare_call(&bark, &[Variant::UInt32(1)]).unwrap_err(),
            StatusCode::BadArgumentsMissing
        );
    }

    #[test]
    fn test_dynamic_ids_are_unique() {
        let (mut space, mut model, _) = built();
        let mut ids = HashSet::new();

        // "Pump1" + 1 and "Pump" + 11 share a browse name but not an id.
        ids.insert(model.add(&mut space, DynamicCategory::Equipment, "Pump1").unwrap());
        for _ in 0..11 {
            ids.insert(model.add(&mut space, DynamicCategory::Equipment, "Pump").unwrap());
        }
        ids.insert(model.add(&mut space, DynamicCategory::PhysicalAsset, "Pump").unwrap());

        assert_eq!(ids.len(), 13);
        assert_eq!(model.equipment_counter(), 12);
        assert_eq!(model.physical_asset_counter(), 1);
        assert_eq!(space.find_by_name("Pump11").len(), 2);
        assert_eq!(space.find_by_name("Pump1").len(), 1);
    }

    #[test]
    fn test_dynamic_id_format() {
        let (mut space, mut model, _) = built();
        let pump = model.add(&mut space, DynamicCategory::Equipment, "Pump").unwrap();
        let tank = model
            .add(&mut space, DynamicCategory::PhysicalAsset, "Pump")
            .unwrap();

        assert_eq!(pump.to_string(), "ns=4;s=Equipment.1.Pump");
        assert_eq!(tank.to_string(), "ns=4;s=PhysicalAssets.1.Pump");
        assert_eq!(space.find_node(&pump).map(|n| n.browse_name.as_str()), Some("Pump1"));
        assert!(space.find_node(&NodeId::string(NAMESPACE, "Pump1")).is_none());
    }

    #[test]
    fn test_add_under_missing_parent_still_advances_counter() {
        let (mut space, mut model, _) = built();
        space.delete_node(&equipment()).unwrap();

        let err = model
            .add(&mut space, DynamicCategory::Equipment, "Tank")
            .unwrap_err();
        assert!(matches!(err, GraphError::ParentNotFound(_)));
        assert_eq!(model.equipment_counter(), 1);
        assert!(!VendorModel::verify_placement(&space));
    }
}
