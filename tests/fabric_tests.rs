#[cfg(test)]
mod fabric_tests {
    use std::collections::BTreeSet;
    use std::fs;

    use tempfile::TempDir;

    use ns3lxc::config::Settings;
    use ns3lxc::devices::{
        DeviceError, DeviceManager, DeviceManifest, DeviceState, ScriptedRunner,
    };
    use ns3lxc::ns3::{RecordingSimulator, ScriptWriter};
    use ns3lxc::orchestrator::{Orchestrator, RunOptions, MANIFEST_FILE};
    use ns3lxc::registry::TypeRegistry;
    use ns3lxc::topology::{number_topology, parse_topology, Iface, TopologyTree};

    /// Two containers and a simulated node at the top level, and a container
    /// in a child topology linked to the first container
    const CAMPUS: &str = r#"
name: campus
time: 20
nodes:
  - name: a
    type: lxc
    ifaces:
      eth0: { ip: 10.0.0.1, netmask: 255.255.255.0 }
      eth1: { ip: 10.0.1.1, netmask: 255.255.255.0 }
    positions:
      - { x: 1, y: 2, z: 0 }
  - name: b
    type: ns3
    ifaces:
      eth0: { ip: 10.0.0.2, netmask: 255.255.255.0 }
    positions:
      - { time: 5, x: 5, y: 0, z: 0 }
      - { time: 1, x: 1, y: 0, z: 0 }
      - { time: 3, x: 3, y: 0, z: 0 }
links:
  - type: csma
    ifaces: [a.eth0, b.eth0]
  - type: p2p
    ifaces: [dorm.c.eth0, a.eth1]
topologies:
  - name: dorm
    nodes:
      - name: c
        type: lxc
        ifaces:
          eth0: { ip: 10.0.1.2, netmask: 255.255.255.0 }
"#;

    fn iface<'t>(tree: &'t TopologyTree, node: &str, name: &str) -> &'t Iface {
        let node = tree
            .arena
            .nodes()
            .find(|n| n.name == node)
            .unwrap_or_else(|| panic!("no node {}", node));
        tree.arena.iface(node.ifaces[name])
    }

    fn campus() -> TopologyTree {
        parse_topology(CAMPUS).unwrap()
    }

    fn numbered_campus() -> TopologyTree {
        let mut tree = campus();
        number_topology(&mut tree, &TypeRegistry::default()).unwrap();
        tree
    }

    #[test]
    fn test_node_numbers_are_contiguous_preorder() {
        let tree = numbered_campus();
        let numbers: Vec<_> = tree
            .nodes_preorder()
            .into_iter()
            .map(|id| {
                let node = tree.arena.node(id);
                (node.name.clone(), node.node_num)
            })
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("a".to_string(), Some(0)),
                ("b".to_string(), Some(1)),
                ("c".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn test_device_names_follow_link_order() {
        let tree = numbered_campus();
        assert_eq!(iface(&tree, "a", "eth0").device_names(), Some(("0_b", "0_t")));
        assert_eq!(iface(&tree, "b", "eth0").device_names(), None);
        assert_eq!(iface(&tree, "c", "eth0").device_names(), Some(("1_b", "1_t")));
        assert_eq!(iface(&tree, "a", "eth1").device_names(), Some(("2_b", "2_t")));

        let taps: Vec<_> = tree
            .arena
            .ifaces()
            .filter_map(|i| i.tap_name.clone())
            .collect();
        let unique: BTreeSet<_> = taps.iter().collect();
        assert_eq!(unique.len(), taps.len());
    }

    #[test]
    fn test_renumbering_gives_identical_tree() {
        let registry = TypeRegistry::default();
        let mut tree = numbered_campus();
        let before = tree.clone();
        number_topology(&mut tree, &registry).unwrap();
        number_topology(&mut tree, &registry).unwrap();
        assert_eq!(before, tree);
    }

    #[test]
    fn test_partially_addressed_iface_never_reaches_the_host() {
        let yaml = r#"
name: partial
nodes:
  - name: a
    type: lxc
    ifaces:
      eth0: { ip: 10.0.0.1 }
      eth1: { netmask: 255.255.255.0 }
      eth2: { ip: 10.0.0.3, netmask: 255.255.255.0 }
  - name: b
    type: docker
    ifaces:
      eth0: { ip: 10.0.0.4, netmask: 255.255.255.0 }
links:
  - type: csma
    ifaces: [a.eth0, a.eth1, a.eth2, b.eth0]
"#;
        let registry = TypeRegistry::default();
        let mut tree = parse_topology(yaml).unwrap();
        let numbering = number_topology(&mut tree, &registry).unwrap();
        assert_eq!(numbering.device_count, 2);
        assert_eq!(iface(&tree, "a", "eth0").device_names(), None);
        assert_eq!(iface(&tree, "a", "eth1").device_names(), None);
        assert_eq!(iface(&tree, "a", "eth2").device_names(), Some(("0_b", "0_t")));

        let mut manager = DeviceManager::new(ScriptedRunner::new());
        assert_eq!(manager.create_all(&tree, &registry).unwrap(), 2);
        let calls = &manager.runner().calls;
        assert_eq!(calls.len(), 10);
        assert!(calls.iter().all(|c| c.contains("0_") || c.contains("1_")));
    }

    #[test]
    fn test_waypoints_are_emitted_in_time_order() {
        let tree = numbered_campus();
        let registry = TypeRegistry::default();
        let script = ScriptWriter::new(&tree, &registry, 20.0).render().unwrap();

        let waypoints: Vec<_> = script
            .lines()
            .filter(|l| l.starts_with("mob->AddWaypoint"))
            .collect();
        assert_eq!(
            waypoints,
            vec![
                "mob->AddWaypoint (Waypoint (Seconds (1.000000), Vector (1.000000,0.000000,0.000000)));",
                "mob->AddWaypoint (Waypoint (Seconds (3.000000), Vector (3.000000,0.000000,0.000000)));",
                "mob->AddWaypoint (Waypoint (Seconds (5.000000), Vector (5.000000,0.000000,0.000000)));",
            ]
        );
        assert!(script.contains("waymobility.Install (nodes.Get (1));"));
        assert!(script.contains("positionAlloc->Add (Vector (1.000000,2.000000,0.000000));"));
    }

    #[test]
    fn test_script_binds_the_same_taps_the_host_gets() {
        let tree = numbered_campus();
        let registry = TypeRegistry::default();
        let script = ScriptWriter::new(&tree, &registry, 20.0).render().unwrap();

        for tap in ["0_t", "1_t", "2_t"] {
            assert!(
                script.contains(&format!("StringValue (\"{}\")", tap)),
                "tap {} not bound in script",
                tap
            );
        }
        assert!(!script.contains("3_t"));
        assert!(script.contains("nodes.Create (3);"));
        assert_eq!(script.matches("csma.EnablePcapAll").count(), 1);
        assert_eq!(script.matches("p2p.EnablePcapAll").count(), 1);
    }

    #[test]
    fn test_teardown_of_missing_devices_succeeds() {
        let tree = numbered_campus();
        let registry = TypeRegistry::default();
        let mut manager = DeviceManager::new(ScriptedRunner::failing_everything());

        assert_eq!(manager.teardown_all(&tree, &registry).unwrap(), 3);
        assert_eq!(manager.runner().calls.len(), 15);
        assert_eq!(manager.state_of("0_b"), DeviceState::Absent);
    }

    #[test]
    fn test_attach_failure_reports_tap_and_stops() {
        let tree = numbered_campus();
        let registry = TypeRegistry::default();
        let runner = ScriptedRunner::new().fail_on("brctl addif 0_b 0_t");
        let mut manager = DeviceManager::new(runner);

        match manager.create_all(&tree, &registry) {
            Err(DeviceError::TapCreate {
                device,
                iface,
                reached,
            }) => {
                assert_eq!(device, "0_t");
                assert_eq!(iface, "eth0");
                assert_eq!(reached, DeviceState::TapUp);
            }
            other => panic!("expected TapCreate, got {:?}", other),
        }
        // c's pair comes first and is left up; nothing is deleted
        let calls = &manager.runner().calls;
        assert_eq!(calls.first().map(String::as_str), Some("brctl addbr 1_b"));
        assert_eq!(calls.last().map(String::as_str), Some("brctl addif 0_b 0_t"));
        assert!(calls.iter().all(|c| !c.contains("del")));
    }

    #[test]
    fn test_manifest_matches_numbering() {
        let tree = numbered_campus();
        let manifest = DeviceManifest::from_tree(&tree, &TypeRegistry::default()).unwrap();
        let pairs: Vec<_> = manifest
            .devices
            .iter()
            .map(|d| (d.node.as_str(), d.iface.as_str(), d.tap.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("c", "eth0", "1_t"), ("a", "eth0", "0_t"), ("a", "eth1", "2_t")]
        );
    }

    #[test]
    fn test_script_only_run_writes_outputs() {
        let out = TempDir::new().unwrap();
        let settings = Settings {
            output_dest: out.path().to_path_buf(),
            ..Settings::default()
        };
        let mut orchestrator = Orchestrator::new(
            &settings,
            TypeRegistry::default(),
            DeviceManager::new(ScriptedRunner::new()),
            Some(RecordingSimulator::new(out.path())),
        );
        let mut tree = campus();
        let options = RunOptions {
            script_only: true,
            ..RunOptions::default()
        };
        orchestrator.run(&mut tree, &options).unwrap();

        let script = fs::read_to_string(out.path().join("campus/campus.cc")).unwrap();
        assert!(script.contains("Simulator::Stop (Seconds (20.000000));"));
        let manifest = fs::read_to_string(out.path().join("campus").join(MANIFEST_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&manifest).unwrap();
        assert_eq!(json["topology"], "campus");
        assert_eq!(json["devices"].as_array().map(Vec::len), Some(3));
        assert!(orchestrator.devices().runner().calls.is_empty());
    }
}
