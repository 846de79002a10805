//! Endpoint codec and reconciliation.
//!
//! Declared endpoint blocks expand into remote [`EndpointSpec`]s on create;
//! observed [`Endpoint`]s flatten back into declared-shape records on read.
//! The remote never reports whether a private-network address came from
//! IPAM, so reads derive that flag by looking the service address up in the
//! address-management service.

use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ScalewayApi;
use crate::api::types::{
    Endpoint, EndpointKind, EndpointSpec, IpamConfig, ListIpsRequest, PrivateNetworkSpec,
};
use crate::diagnostics::{Diagnostic, Diagnostics, WarningKind};
use crate::error::{ProviderError, tolerate_not_found};
use crate::locality::{self, Region};
use crate::provider::Provider;
use crate::wait::Deadline;

/// Resource type under which IPAM tracks database instance addresses.
pub const IPAM_RESOURCE_TYPE: &str = "rdb_instance";

/// Declared `private_network` block.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivateNetworkBlock {
    /// Private network identifier, bare or localized.
    pub pn_id: String,
    /// Static service address in CIDR notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ip: Option<String>,
    /// Requests an IPAM-allocated address.
    #[serde(default)]
    pub enable_ipam: bool,
}

/// Observed private-network endpoint in declared shape.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PrivateNetworkState {
    /// Remote endpoint identifier.
    pub endpoint_id: String,
    /// `<region>/<uuid>` of the private network.
    pub pn_id: String,
    /// Service address in CIDR notation.
    pub service_ip: String,
    /// Host address.
    pub ip: Option<String>,
    /// TCP port.
    pub port: u16,
    /// Display name.
    pub name: Option<String>,
    /// DNS name.
    pub hostname: Option<String>,
    /// Zone of the attachment.
    pub zone: String,
    /// Whether IPAM holds the service address.
    pub enable_ipam: bool,
}

/// Observed public endpoint (load balancer or direct access) in declared
/// shape.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PublicEndpointState {
    /// Remote endpoint identifier.
    pub endpoint_id: String,
    /// Public address.
    pub ip: Option<String>,
    /// TCP port.
    pub port: u16,
    /// Display name.
    pub name: Option<String>,
    /// DNS name.
    pub hostname: Option<String>,
}

/// Every observed endpoint of one owner, grouped by kind.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FlattenedEndpoints {
    /// Private-network endpoints.
    pub private_network: Vec<PrivateNetworkState>,
    /// Load-balancer endpoints.
    pub load_balancer: Vec<PublicEndpointState>,
    /// Direct-access endpoints.
    pub direct_access: Vec<PublicEndpointState>,
}

impl FlattenedEndpoints {
    /// Returns the address and port clients should use, preferring the load
    /// balancer and falling back to its hostname.
    #[must_use]
    pub fn public_address(&self) -> (Option<String>, Option<u16>) {
        self.load_balancer
            .first()
            .map_or((None, None), |endpoint| {
                let address = endpoint.ip.clone().or_else(|| endpoint.hostname.clone());
                (address, Some(endpoint.port))
            })
    }
}

/// Endpoint kinds reconciled independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndpointSlot {
    /// Private network attachment.
    PrivateNetwork,
    /// Public load balancer.
    LoadBalancer,
    /// Direct public access.
    DirectAccess,
}

impl EndpointSlot {
    /// Returns true when `endpoint` belongs to this slot.
    #[must_use]
    pub const fn matches(self, endpoint: &Endpoint) -> bool {
        matches!(
            (self, &endpoint.kind),
            (Self::PrivateNetwork, EndpointKind::PrivateNetwork(_))
                | (Self::LoadBalancer, EndpointKind::LoadBalancer)
                | (Self::DirectAccess, EndpointKind::DirectAccess)
        )
    }

    const fn label(self) -> &'static str {
        match self {
            Self::PrivateNetwork => "private_network",
            Self::LoadBalancer => "load_balancer",
            Self::DirectAccess => "direct_access",
        }
    }
}

/// Expands a declared private-network block.
///
/// A static address wins over IPAM; declaring both records an
/// [`WarningKind::IpamOverridden`] warning.
///
/// # Errors
///
/// Returns [`ProviderError::EndpointUnderspecified`] when neither a static
/// address nor IPAM is selected, and [`ProviderError::InvalidAttribute`]
/// for a malformed address.
pub fn expand_private_network(
    block: &PrivateNetworkBlock,
    diagnostics: &Diagnostics,
) -> Result<EndpointSpec, ProviderError> {
    let private_network_id = locality::expand_id(&block.pn_id).to_owned();
    let static_ip = block
        .service_ip
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(service_ip) = static_ip {
        IpNetwork::from_str(service_ip).map_err(|err| {
            ProviderError::invalid_attribute("private_network.service_ip", err.to_string())
        })?;
        if block.enable_ipam {
            diagnostics.warn(Diagnostic {
                kind: WarningKind::IpamOverridden,
                summary: String::from("static service_ip takes precedence over enable_ipam"),
                detail: format!(
                    "private network {} declares both service_ip {service_ip} and enable_ipam; the static address is used",
                    block.pn_id
                ),
                attribute: Some(String::from("private_network.enable_ipam")),
            });
        }
        return Ok(EndpointSpec::PrivateNetwork(PrivateNetworkSpec {
            private_network_id,
            service_ip: Some(service_ip.to_owned()),
            ipam_config: None,
        }));
    }
    if block.enable_ipam {
        return Ok(EndpointSpec::PrivateNetwork(PrivateNetworkSpec {
            private_network_id,
            service_ip: None,
            ipam_config: Some(IpamConfig {}),
        }));
    }
    Err(ProviderError::EndpointUnderspecified {
        pn_id: block.pn_id.clone(),
    })
}

/// Expands the endpoint blocks of an instance, private network first.
///
/// # Errors
///
/// Propagates [`expand_private_network`] failures.
pub fn expand_instance_endpoints(
    private_network: Option<&PrivateNetworkBlock>,
    load_balancer: bool,
    diagnostics: &Diagnostics,
) -> Result<Vec<EndpointSpec>, ProviderError> {
    let mut specs = Vec::new();
    if let Some(block) = private_network {
        specs.push(expand_private_network(block, diagnostics)?);
    }
    if load_balancer {
        specs.push(EndpointSpec::LoadBalancer {});
    }
    Ok(specs)
}

/// Expands the endpoint blocks of a read replica.
///
/// # Errors
///
/// Propagates [`expand_private_network`] failures.
pub fn expand_replica_endpoints(
    private_network: Option<&PrivateNetworkBlock>,
    direct_access: bool,
    diagnostics: &Diagnostics,
) -> Result<Vec<EndpointSpec>, ProviderError> {
    let mut specs = Vec::new();
    if let Some(block) = private_network {
        specs.push(expand_private_network(block, diagnostics)?);
    }
    if direct_access {
        specs.push(EndpointSpec::DirectAccess {});
    }
    Ok(specs)
}

fn host_of(address: &str) -> Option<IpAddr> {
    IpNetwork::from_str(address.trim())
        .ok()
        .map(|network| network.ip())
}

fn public_state(endpoint: &Endpoint) -> PublicEndpointState {
    PublicEndpointState {
        endpoint_id: endpoint.id.clone(),
        ip: endpoint.ip.clone(),
        port: endpoint.port,
        name: endpoint.name.clone(),
        hostname: endpoint.hostname.clone(),
    }
}

/// Flattens observed endpoints into declared-shape records.
///
/// `ipam_hosts` lists the addresses IPAM holds for the owning instance; a
/// private-network endpoint whose service address is among them is marked
/// IPAM-managed.
#[must_use]
pub fn flatten_endpoints(endpoints: &[Endpoint], ipam_hosts: &[IpAddr]) -> FlattenedEndpoints {
    let mut flattened = FlattenedEndpoints::default();
    for endpoint in endpoints {
        match &endpoint.kind {
            EndpointKind::PrivateNetwork(details) => {
                let enable_ipam =
                    host_of(&details.service_ip).is_some_and(|host| ipam_hosts.contains(&host));
                flattened.private_network.push(PrivateNetworkState {
                    endpoint_id: endpoint.id.clone(),
                    pn_id: locality::format_localized(
                        &details.zone.region(),
                        &details.private_network_id,
                    ),
                    service_ip: details.service_ip.clone(),
                    ip: endpoint.ip.clone(),
                    port: endpoint.port,
                    name: endpoint.name.clone(),
                    hostname: endpoint.hostname.clone(),
                    zone: details.zone.to_string(),
                    enable_ipam,
                });
            }
            EndpointKind::LoadBalancer => flattened.load_balancer.push(public_state(endpoint)),
            EndpointKind::DirectAccess => flattened.direct_access.push(public_state(endpoint)),
            EndpointKind::Unknown => {}
        }
    }
    flattened
}

fn same_network(lhs: &str, rhs: &str) -> bool {
    match (IpNetwork::from_str(lhs.trim()), IpNetwork::from_str(rhs.trim())) {
        (Ok(left), Ok(right)) => left == right,
        _ => lhs.trim() == rhs.trim(),
    }
}

/// Decides whether the private-network endpoint must be recreated.
///
/// Compares presence, the network identifier (ignoring locality), the
/// IPAM/static mode taken from the declaration, and the static address.
#[must_use]
pub fn private_network_changed(
    observed: Option<&PrivateNetworkState>,
    declared: Option<&PrivateNetworkBlock>,
) -> bool {
    let (Some(current), Some(wanted)) = (observed, declared) else {
        return observed.is_some() != declared.is_some();
    };
    if locality::expand_id(&current.pn_id) != locality::expand_id(&wanted.pn_id) {
        return true;
    }
    let wanted_static = wanted
        .service_ip
        .as_deref()
        .filter(|value| !value.trim().is_empty());
    wanted_static.map_or(!current.enable_ipam, |service_ip| {
        current.enable_ipam || !same_network(&current.service_ip, service_ip)
    })
}

/// Owner of a set of endpoints.
#[derive(Clone, Copy, Debug)]
pub enum EndpointOwner<'a> {
    /// A database instance.
    Instance(&'a str),
    /// A read replica.
    ReadReplica(&'a str),
}

impl EndpointOwner<'_> {
    const fn id(&self) -> &str {
        match self {
            Self::Instance(id) | Self::ReadReplica(id) => id,
        }
    }
}

impl<C: ScalewayApi> Provider<C> {
    /// Returns the IPv4 hosts IPAM holds for `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns remote failures of the address-management service.
    pub async fn ipam_hosts(
        &self,
        deadline: &Deadline,
        region: &Region,
        instance_id: &str,
    ) -> Result<Vec<IpAddr>, ProviderError> {
        let request = ListIpsRequest {
            region: region.clone(),
            resource_type: String::from(IPAM_RESOURCE_TYPE),
            resource_id: instance_id.to_owned(),
            is_ipv6: false,
        };
        let ips = deadline
            .guard("list_ips", instance_id, async {
                Ok(self.client.list_ips(&request).await?)
            })
            .await?;
        Ok(ips.iter().filter_map(|ip| host_of(&ip.address)).collect())
    }

    /// Flattens `endpoints`, consulting IPAM only when a private-network
    /// endpoint is present.
    ///
    /// # Errors
    ///
    /// Returns remote failures of the address-management service.
    pub async fn flatten_observed_endpoints(
        &self,
        deadline: &Deadline,
        region: &Region,
        owner_instance_id: &str,
        endpoints: &[Endpoint],
    ) -> Result<FlattenedEndpoints, ProviderError> {
        let has_private = endpoints
            .iter()
            .any(|endpoint| EndpointSlot::PrivateNetwork.matches(endpoint));
        let hosts = if has_private {
            self.ipam_hosts(deadline, region, owner_instance_id).await?
        } else {
            Vec::new()
        };
        Ok(flatten_endpoints(endpoints, &hosts))
    }

    async fn wait_for_owner(
        &self,
        deadline: &Deadline,
        region: &Region,
        owner: EndpointOwner<'_>,
    ) -> Result<(), ProviderError> {
        match owner {
            EndpointOwner::Instance(id) => {
                self.wait_for_instance(deadline, region, id).await?;
            }
            EndpointOwner::ReadReplica(id) => {
                self.wait_for_read_replica(deadline, region, id).await?;
            }
        }
        Ok(())
    }

    /// Replaces every observed endpoint of `slot` with `spec`.
    ///
    /// Observed endpoints are deleted one by one, waiting for the owner
    /// after each; the new endpoint, if any, is then created and awaited.
    ///
    /// # Errors
    ///
    /// Returns remote failures other than a 404 on delete, and deadline
    /// outcomes.
    pub async fn replace_endpoints(
        &self,
        deadline: &Deadline,
        region: &Region,
        owner: EndpointOwner<'_>,
        slot: EndpointSlot,
        observed: &[Endpoint],
        spec: Option<&EndpointSpec>,
    ) -> Result<(), ProviderError> {
        for endpoint in observed.iter().filter(|endpoint| slot.matches(endpoint)) {
            info!(owner = owner.id(), endpoint_id = %endpoint.id, kind = slot.label(), "deleting endpoint");
            let deleted = deadline
                .guard("delete_endpoint", &endpoint.id, async {
                    Ok(self.client.delete_endpoint(region, &endpoint.id).await?)
                })
                .await;
            tolerate_not_found(deleted)?;
            self.wait_for_owner(deadline, region, owner).await?;
        }
        let Some(new_spec) = spec else {
            return Ok(());
        };
        info!(owner = owner.id(), kind = slot.label(), "creating endpoint");
        match owner {
            EndpointOwner::Instance(id) => {
                deadline
                    .guard("create_endpoint", id, async {
                        Ok(self.client.create_endpoint(region, id, new_spec).await?)
                    })
                    .await?;
            }
            EndpointOwner::ReadReplica(id) => {
                let specs = std::slice::from_ref(new_spec);
                deadline
                    .guard("create_read_replica_endpoint", id, async {
                        Ok(self
                            .client
                            .create_read_replica_endpoint(region, id, specs)
                            .await?)
                    })
                    .await?;
            }
        }
        self.wait_for_owner(deadline, region, owner).await
    }
}
