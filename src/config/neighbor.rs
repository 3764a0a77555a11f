use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Serialize;

use super::file::{Section, Statement};
use crate::error::{Error, Result};

struct Defaults {}

impl Defaults {
    fn hold_time() -> u16 {
        180
    }

    fn group_updates() -> bool {
        true
    }

    fn auto_flush() -> bool {
        true
    }

    fn adj_rib_in() -> bool {
        true
    }

    fn adj_rib_out() -> bool {
        true
    }

    fn families() -> Vec<String> {
        vec![String::from("ipv4 unicast"), String::from("ipv6 unicast")]
    }
}

/// Neighbor statements modeled as fields, anything else lands in `options`
const KNOWN_STATEMENTS: &[&str] = &[
    "description",
    "router-id",
    "local-address",
    "local-as",
    "peer-as",
    "hold-time",
    "passive",
    "listen",
    "connect",
    "md5-password",
    "ttl-security",
    "group-updates",
    "auto-flush",
    "adj-rib-in",
    "adj-rib-out",
    "manual-eor",
    "inherit",
];

/// Counters of what the daemon queues for a peer once the session is up
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolCounters {
    /// Static routes to announce
    pub messages: u64,
    /// Families a route refresh can be requested for
    pub refresh: u64,
    /// End-of-RIB markers sent manually
    pub eor: u64,
}

/// Processes bound to a neighbor through an `api` block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApiBinding {
    pub name: Option<String>,
    pub processes: Vec<String>,
    pub neighbor_changes: bool,
    pub receive: Vec<String>,
    pub send: Vec<String>,
}

impl ApiBinding {
    fn from_section(section: &Section) -> Self {
        let messages = |kind: &str| -> Vec<String> {
            section
                .section(kind)
                .map(|s| s.statements.iter().map(|stmt| stmt.words.join(" ")).collect())
                .unwrap_or_default()
        };
        Self {
            name: section.name().map(String::from),
            processes: section
                .statements
                .iter()
                .filter(|stmt| stmt.keyword() == "processes" || stmt.keyword() == "process")
                .flat_map(|stmt| stmt.args().iter().cloned())
                .collect(),
            neighbor_changes: section.statement("neighbor-changes").is_some(),
            receive: messages("receive"),
            send: messages("send"),
        }
    }
}

/// Read-only snapshot of a `neighbor` declaration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NeighborRecord {
    pub name: String,
    pub description: Option<String>,
    pub peer_address: IpAddr,
    pub local_address: Option<IpAddr>,
    pub local_as: u32,
    pub peer_as: u32,
    pub router_id: Option<IpAddr>,
    pub hold_time: u16,
    pub passive: bool,
    pub listen: Option<u16>,
    pub connect: Option<u16>,
    pub md5_password: Option<String>,
    pub ttl_security: Option<u8>,
    pub group_updates: bool,
    pub auto_flush: bool,
    pub adj_rib_in: bool,
    pub adj_rib_out: bool,
    pub manual_eor: bool,
    pub families: Vec<String>,
    pub capabilities: BTreeMap<String, String>,
    pub api: Vec<ApiBinding>,
    pub routes: Vec<String>,
    pub rib: String,
    #[serde(flatten)]
    pub counters: ProtocolCounters,
    pub options: BTreeMap<String, String>,
}

/// Neighbor section with the sections it inherits from (templates, group)
struct Scope<'a> {
    name: &'a str,
    layers: Vec<&'a Section>,
}

impl<'a> Scope<'a> {
    fn statement(&self, keyword: &str) -> Option<&'a Statement> {
        self.layers.iter().find_map(|layer| layer.statement(keyword))
    }

    fn section(&self, kind: &str) -> Option<&'a Section> {
        self.layers.iter().find_map(|layer| layer.section(kind))
    }

    fn invalid(&self, reason: String) -> Error {
        Error::InvalidNeighbor {
            neighbor: self.name.to_string(),
            reason,
        }
    }

    fn parse<T: std::str::FromStr>(&self, keyword: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.statement(keyword) {
            Some(stmt) => stmt
                .value()
                .parse::<T>()
                .map(Some)
                .map_err(|err| self.invalid(format!("{} '{}': {}", keyword, stmt.value(), err))),
            None => Ok(None),
        }
    }

    /// `passive;` `passive true;` `passive disable;`
    fn flag(&self, keyword: &str, default: bool) -> Result<bool> {
        match self.statement(keyword) {
            Some(stmt) => match stmt.value().to_lowercase().as_str() {
                "" | "true" | "enable" | "yes" => Ok(true),
                "false" | "disable" | "no" => Ok(false),
                other => Err(self.invalid(format!("{} expects a boolean, got '{}'", keyword, other))),
            },
            None => Ok(default),
        }
    }

    /// `local-address auto;` leaves the address to the kernel
    fn address(&self, keyword: &str) -> Result<Option<IpAddr>> {
        match self.statement(keyword) {
            Some(stmt) if stmt.value() == "auto" => Ok(None),
            _ => self.parse(keyword),
        }
    }
}

impl NeighborRecord {
    /// Build from a neighbor section; `inherited` sections are searched in order
    /// for statements and blocks the neighbor doesn't declare itself
    pub(super) fn from_section(section: &Section, inherited: &[&Section]) -> Result<Self> {
        let name = section.name().unwrap_or_default();
        let mut layers = vec![section];
        layers.extend_from_slice(inherited);
        let scope = Scope { name, layers };

        let peer_address: IpAddr = name
            .parse()
            .map_err(|err| scope.invalid(format!("peer address '{}': {}", name, err)))?;
        let local_address = scope.address("local-address")?;
        let local_as: u32 = scope
            .parse("local-as")?
            .ok_or_else(|| scope.invalid(String::from("missing local-as")))?;
        let peer_as: u32 = scope
            .parse("peer-as")?
            .ok_or_else(|| scope.invalid(String::from("missing peer-as")))?;
        let router_id = match scope.address("router-id")? {
            Some(router_id) => Some(router_id),
            None => local_address.filter(IpAddr::is_ipv4),
        };

        let families: Vec<String> = match scope.section("family") {
            Some(family) => family
                .statements
                .iter()
                .map(|stmt| stmt.words.join(" "))
                .collect(),
            None => Defaults::families(),
        };
        let capabilities: BTreeMap<String, String> = scope
            .section("capability")
            .map(|capability| {
                capability
                    .statements
                    .iter()
                    .map(|stmt| {
                        let value = if stmt.args().is_empty() {
                            String::from("enable")
                        } else {
                            stmt.value()
                        };
                        (stmt.keyword().to_string(), value)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let api: Vec<ApiBinding> = scope
            .layers
            .iter()
            .flat_map(|layer| layer.sections_of("api"))
            .map(ApiBinding::from_section)
            .collect();
        let routes = static_routes(&scope);
        let manual_eor = scope.flag("manual-eor", false)?;

        let refresh_enabled = capabilities
            .get("route-refresh")
            .map(|value| value != "disable")
            .unwrap_or(false);
        let counters = ProtocolCounters {
            messages: routes.len() as u64,
            refresh: if refresh_enabled { families.len() as u64 } else { 0 },
            eor: if manual_eor { families.len() as u64 } else { 0 },
        };

        let display = |addr: Option<IpAddr>| {
            addr.map(|addr| addr.to_string())
                .unwrap_or_else(|| String::from("auto"))
        };
        let rib = format!(
            "neighbor {} local-ip {} local-as {} peer-as {} router-id {}",
            peer_address,
            display(local_address),
            local_as,
            peer_as,
            display(router_id)
        );

        let mut options = BTreeMap::new();
        for layer in scope.layers.iter().rev() {
            for stmt in &layer.statements {
                if !KNOWN_STATEMENTS.iter().any(|known| *known == stmt.keyword()) {
                    options.insert(stmt.keyword().to_string(), stmt.value());
                }
            }
        }

        Ok(Self {
            name: peer_address.to_string(),
            description: scope.statement("description").map(Statement::value),
            peer_address,
            local_address,
            local_as,
            peer_as,
            router_id,
            hold_time: scope.parse("hold-time")?.unwrap_or_else(Defaults::hold_time),
            passive: scope.flag("passive", false)?,
            listen: scope.parse("listen")?,
            connect: scope.parse("connect")?,
            md5_password: scope.statement("md5-password").map(Statement::value),
            ttl_security: scope.parse("ttl-security")?,
            group_updates: scope.flag("group-updates", Defaults::group_updates())?,
            auto_flush: scope.flag("auto-flush", Defaults::auto_flush())?,
            adj_rib_in: scope.flag("adj-rib-in", Defaults::adj_rib_in())?,
            adj_rib_out: scope.flag("adj-rib-out", Defaults::adj_rib_out())?,
            manual_eor,
            families,
            capabilities,
            api,
            routes,
            rib,
            counters,
            options,
        })
    }

    /// Process names referenced by `api` blocks
    pub fn api_processes(&self) -> impl Iterator<Item = &str> {
        self.api
            .iter()
            .flat_map(|api| api.processes.iter().map(String::as_str))
    }
}

/// Routes from `static { route ...; }` and `announce { ipv4 { unicast ...; } }`
fn static_routes(scope: &Scope) -> Vec<String> {
    let mut routes = Vec::new();
    if let Some(section) = scope.section("static") {
        for stmt in section.statements.iter().filter(|s| s.keyword() == "route") {
            routes.push(stmt.value());
        }
        // route 10.0.0.0/24 { next-hop 192.0.2.1; }
        for route in section.sections_of("route") {
            let mut words: Vec<String> = route.words[1..].to_vec();
            for stmt in &route.statements {
                words.extend(stmt.words.iter().cloned());
            }
            routes.push(words.join(" "));
        }
    }
    if let Some(section) = scope.section("announce") {
        for afi in &section.sections {
            for stmt in &afi.statements {
                routes.push(format!("{} {}", afi.kind(), stmt.words.join(" ")));
            }
        }
    }
    routes
}
