//! Built-in link types and the ns-3 statements they emit.

use crate::topology::Link;

/// One interface of a link, resolved against the numbered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEndpoint<'a> {
    pub node_num: u32,
    /// Present only for interfaces that received a bridge/TAP pair
    pub tap_name: Option<&'a str>,
}

/// A link ready to be written, with its position in the wiring order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkInstance<'a> {
    /// Index of this link across the whole wiring pass; names the
    /// per-link variables of the generated program.
    pub index: usize,
    pub link: &'a Link,
    pub endpoints: Vec<LinkEndpoint<'a>>,
}

impl LinkInstance<'_> {
    fn nodes_var(&self) -> String {
        format!("link{}Nodes", self.index)
    }

    fn devices_var(&self) -> String {
        format!("link{}Devices", self.index)
    }
}

/// How many interfaces a link type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointLimits {
    pub min: usize,
    pub max: Option<usize>,
}

impl EndpointLimits {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl std::fmt::Display for EndpointLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "exactly {}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Behavior attached to a link type string.
///
/// `write_includes`, `write_type_init` and `write_closing_remarks` are only
/// invoked for types that occur somewhere in the tree.
pub trait LinkType {
    /// Key used in topology descriptions.
    fn name(&self) -> &str;

    fn endpoint_limits(&self) -> EndpointLimits;

    fn write_includes(&self, out: &mut String);

    /// Helper declarations shared by every link of this type.
    fn write_type_init(&self, out: &mut String);

    /// Instantiate one link and attach its interfaces.
    fn write_link(&self, out: &mut String, link: &LinkInstance<'_>);

    fn write_closing_remarks(&self, out: &mut String);
}

/// Collect the link's nodes into a container named after the link.
fn write_node_container(out: &mut String, link: &LinkInstance<'_>) {
    let nodes = link.nodes_var();
    out.push_str(&format!("NodeContainer {};\n", nodes));
    for endpoint in &link.endpoints {
        out.push_str(&format!("{}.Add (nodes.Get ({}));\n", nodes, endpoint.node_num));
    }
}

/// Bind every endpoint that owns a TAP device to its simulated net device.
fn write_tap_bridges(out: &mut String, link: &LinkInstance<'_>) {
    let devices = link.devices_var();
    for (i, endpoint) in link.endpoints.iter().enumerate() {
        if let Some(tap) = endpoint.tap_name {
            out.push_str(&format!(
                "tapBridge.SetAttribute (\"DeviceName\", StringValue (\"{}\"));\n",
                tap
            ));
            out.push_str(&format!(
                "tapBridge.Install (nodes.Get ({}), {}.Get ({}));\n",
                endpoint.node_num, devices, i
            ));
        }
    }
}

/// Shared-medium Ethernet.
#[derive(Debug, Clone, Default)]
pub struct CsmaLink;

impl CsmaLink {
    const DEFAULT_DATA_RATE: &'static str = "100Mbps";
    const DEFAULT_DELAY: &'static str = "2ms";
}

impl LinkType for CsmaLink {
    fn name(&self) -> &str {
        "csma"
    }

    fn endpoint_limits(&self) -> EndpointLimits {
        EndpointLimits { min: 2, max: None }
    }

    fn write_includes(&self, out: &mut String) {
        out.push_str("#include \"ns3/csma-module.h\"\n");
    }

    fn write_type_init(&self, out: &mut String) {
        out.push_str("CsmaHelper csma;\n");
    }

    fn write_link(&self, out: &mut String, link: &LinkInstance<'_>) {
        write_node_container(out, link);
        let rate = link.link.bandwidth.as_deref().unwrap_or(Self::DEFAULT_DATA_RATE);
        let delay = link.link.latency.as_deref().unwrap_or(Self::DEFAULT_DELAY);
        out.push_str(&format!(
            "csma.SetChannelAttribute (\"DataRate\", StringValue (\"{}\"));\n",
            rate
        ));
        out.push_str(&format!(
            "csma.SetChannelAttribute (\"Delay\", StringValue (\"{}\"));\n",
            delay
        ));
        out.push_str(&format!(
            "NetDeviceContainer {} = csma.Install ({});\n",
            link.devices_var(),
            link.nodes_var()
        ));
        write_tap_bridges(out, link);
    }

    fn write_closing_remarks(&self, out: &mut String) {
        out.push_str("csma.EnablePcapAll (\"csma\", true);\n");
    }
}

/// Ad-hoc 802.11b; every link gets its own channel.
#[derive(Debug, Clone, Default)]
pub struct WifiLink;

impl LinkType for WifiLink {
    fn name(&self) -> &str {
        "wifi"
    }

    fn endpoint_limits(&self) -> EndpointLimits {
        EndpointLimits { min: 1, max: None }
    }

    fn write_includes(&self, out: &mut String) {
        out.push_str("#include \"ns3/wifi-module.h\"\n");
    }

    fn write_type_init(&self, out: &mut String) {
        out.push_str("WifiHelper wifi;\n");
        out.push_str("wifi.SetStandard (WIFI_STANDARD_80211b);\n");
        out.push_str(
            "wifi.SetRemoteStationManager (\"ns3::ConstantRateWifiManager\", \"DataMode\", StringValue (\"DsssRate11Mbps\"));\n",
        );
        out.push_str("WifiMacHelper wifiMac;\n");
        out.push_str("wifiMac.SetType (\"ns3::AdhocWifiMac\");\n");
        out.push_str("YansWifiPhyHelper wifiPhy;\n");
        out.push_str("YansWifiChannelHelper wifiChannel = YansWifiChannelHelper::Default ();\n");
    }

    fn write_link(&self, out: &mut String, link: &LinkInstance<'_>) {
        write_node_container(out, link);
        out.push_str("wifiPhy.SetChannel (wifiChannel.Create ());\n");
        out.push_str(&format!(
            "NetDeviceContainer {} = wifi.Install (wifiPhy, wifiMac, {});\n",
            link.devices_var(),
            link.nodes_var()
        ));
        write_tap_bridges(out, link);
    }

    fn write_closing_remarks(&self, out: &mut String) {
        out.push_str("wifiPhy.EnablePcapAll (\"wifi\");\n");
    }
}

/// Dedicated full-duplex link between two interfaces.
#[derive(Debug, Clone, Default)]
pub struct PointToPointLink;

impl PointToPointLink {
    const DEFAULT_DATA_RATE: &'static str = "5Mbps";
    const DEFAULT_DELAY: &'static str = "2ms";
}

impl LinkType for PointToPointLink {
    fn name(&self) -> &str {
        "p2p"
    }

    fn endpoint_limits(&self) -> EndpointLimits {
        EndpointLimits { min: 2, max: Some(2) }
    }

    fn write_includes(&self, out: &mut String) {
        out.push_str("#include \"ns3/point-to-point-module.h\"\n");
    }

    fn write_type_init(&self, out: &mut String) {
        out.push_str("PointToPointHelper p2p;\n");
    }

    fn write_link(&self, out: &mut String, link: &LinkInstance<'_>) {
        write_node_container(out, link);
        let rate = link.link.bandwidth.as_deref().unwrap_or(Self::DEFAULT_DATA_RATE);
        let delay = link.link.latency.as_deref().unwrap_or(Self::DEFAULT_DELAY);
        out.push_str(&format!(
            "p2p.SetDeviceAttribute (\"DataRate\", StringValue (\"{}\"));\n",
            rate
        ));
        out.push_str(&format!(
            "p2p.SetChannelAttribute (\"Delay\", StringValue (\"{}\"));\n",
            delay
        ));
        out.push_str(&format!(
            "NetDeviceContainer {} = p2p.Install ({});\n",
            link.devices_var(),
            link.nodes_var()
        ));
        write_tap_bridges(out, link);
    }

    fn write_closing_remarks(&self, out: &mut String) {
        out.push_str("p2p.EnablePcapAll (\"p2p\");\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(node_num: u32, tap_name: Option<&str>) -> LinkEndpoint<'_> {
        LinkEndpoint {
            node_num,
            tap_name,
        }
    }

    #[test]
    fn test_endpoint_limits() {
        let p2p = PointToPointLink.endpoint_limits();
        assert!(p2p.accepts(2));
        assert!(!p2p.accepts(1));
        assert!(!p2p.accepts(3));
        assert_eq!(p2p.to_string(), "exactly 2");

        let csma = CsmaLink.endpoint_limits();
        assert!(csma.accepts(8));
        assert_eq!(csma.to_string(), "at least 2");
    }

    #[test]
    fn test_csma_link_attaches_only_tapped_endpoints() {
        let link = Link::new("csma", Vec::new());
        let instance = LinkInstance {
            index: 3,
            link: &link,
            endpoints: vec![endpoint(0, Some("0_t")), endpoint(4, None)],
        };

        let mut out = String::new();
        CsmaLink.write_link(&mut out, &instance);

        assert!(out.contains("NodeContainer link3Nodes;\n"));
        assert!(out.contains("link3Nodes.Add (nodes.Get (4));\n"));
        assert!(out.contains("StringValue (\"100Mbps\")"));
        assert!(out.contains("NetDeviceContainer link3Devices = csma.Install (link3Nodes);\n"));
        assert!(out.contains("tapBridge.Install (nodes.Get (0), link3Devices.Get (0));\n"));
        assert!(!out.contains("nodes.Get (4), link3Devices"));
    }

    #[test]
    fn test_p2p_link_uses_link_attributes() {
        let mut link = Link::new("p2p", Vec::new());
        link.bandwidth = Some("1Gbps".to_string());
        link.latency = Some("10ms".to_string());
        let instance = LinkInstance {
            index: 0,
            link: &link,
            endpoints: vec![endpoint(0, None), endpoint(1, None)],
        };

        let mut out = String::new();
        PointToPointLink.write_link(&mut out, &instance);
        assert!(out.contains("p2p.SetDeviceAttribute (\"DataRate\", StringValue (\"1Gbps\"));"));
        assert!(out.contains("p2p.SetChannelAttribute (\"Delay\", StringValue (\"10ms\"));"));
    }
}
