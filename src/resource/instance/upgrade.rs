//! Upgrade planner.
//!
//! Turns the difference between the observed and the declared instance
//! shape into an ordered list of single-field upgrade operations, enforcing
//! the volume, encryption and disk-full constraints before anything is sent.

use serde::Serialize;

use crate::api::types::{InstanceStatus, UpgradeInstanceRequest, VolumeType};
use crate::error::ProviderError;

/// Bytes per gigabyte as counted by the remote.
pub const BYTES_PER_GB: u64 = 1_000_000_000;

/// Allocation unit of block volumes, in gigabytes.
pub const VOLUME_SIZE_STEP_GB: u64 = 5;

/// Attributes of an instance the planner reasons about.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceShape {
    /// Commercial node type.
    pub node_type: String,
    /// High-availability flag.
    pub is_ha_cluster: bool,
    /// Storage kind.
    pub volume_type: VolumeType,
    /// Volume size; unset for local storage.
    pub volume_size_gb: Option<u64>,
    /// Encryption at rest.
    pub encryption_at_rest: bool,
}

/// One upgrade step.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UpgradeOp {
    /// Change the storage kind.
    VolumeType {
        /// Target storage kind.
        volume_type: VolumeType,
    },
    /// Grow the volume.
    VolumeSize {
        /// Target size in gigabytes.
        size_gb: u64,
    },
    /// Change the node type.
    NodeType {
        /// Target node type.
        node_type: String,
    },
    /// Toggle high availability.
    EnableHa {
        /// Target flag.
        enabled: bool,
    },
    /// Turn on encryption at rest.
    EnableEncryption,
}

impl UpgradeOp {
    /// Returns the remote payload for this step.
    #[must_use]
    pub fn to_request(&self) -> UpgradeInstanceRequest {
        match self {
            Self::VolumeType { volume_type } => UpgradeInstanceRequest::VolumeType(*volume_type),
            Self::VolumeSize { size_gb } => {
                UpgradeInstanceRequest::VolumeSize(size_gb.saturating_mul(BYTES_PER_GB))
            }
            Self::NodeType { node_type } => UpgradeInstanceRequest::NodeType(node_type.clone()),
            Self::EnableHa { enabled } => UpgradeInstanceRequest::EnableHa(*enabled),
            Self::EnableEncryption => UpgradeInstanceRequest::EnableEncryption(true),
        }
    }

    const fn is_node_type(&self) -> bool {
        matches!(self, Self::NodeType { .. })
    }

    const fn is_volume_size(&self) -> bool {
        matches!(self, Self::VolumeSize { .. })
    }
}

/// Checks a declared volume against its storage kind.
///
/// # Errors
///
/// Returns [`ProviderError::VolumeSizeOnLocal`] for a size on local storage
/// and [`ProviderError::VolumeGranularity`] for a size that is not a whole
/// number of allocation units.
pub fn validate_volume(volume_type: VolumeType, size_gb: Option<u64>) -> Result<(), ProviderError> {
    let Some(requested_gb) = size_gb else {
        return Ok(());
    };
    if volume_type.is_local() {
        return Err(ProviderError::VolumeSizeOnLocal);
    }
    if requested_gb == 0 || requested_gb.rem_euclid(VOLUME_SIZE_STEP_GB) != 0 {
        return Err(ProviderError::VolumeGranularity { requested_gb });
    }
    Ok(())
}

/// Plans the upgrade steps from `current` to `target`.
///
/// Steps come out in the order volume type, volume size, node type, HA,
/// encryption. A node-type change moves to the front when the target is
/// local storage. On a disk-full block volume a node-type change is only
/// allowed behind a size increase.
///
/// # Errors
///
/// Returns the volume errors of [`validate_volume`],
/// [`ProviderError::VolumeShrink`], [`ProviderError::EncryptionDowngrade`]
/// and [`ProviderError::NodeUpgradeBlockedByDiskFull`].
pub fn plan_upgrades(
    instance_id: &str,
    current: &InstanceShape,
    target: &InstanceShape,
    status: InstanceStatus,
) -> Result<Vec<UpgradeOp>, ProviderError> {
    validate_volume(target.volume_type, target.volume_size_gb)?;
    if current.encryption_at_rest && !target.encryption_at_rest {
        return Err(ProviderError::EncryptionDowngrade);
    }

    let mut ops = Vec::new();
    if current.volume_type != target.volume_type {
        ops.push(UpgradeOp::VolumeType {
            volume_type: target.volume_type,
        });
    }
    if let Some(requested_gb) = target.volume_size_gb {
        match current.volume_size_gb {
            Some(current_gb) if requested_gb < current_gb => {
                return Err(ProviderError::VolumeShrink {
                    current_gb,
                    requested_gb,
                });
            }
            Some(current_gb) if requested_gb == current_gb => {}
            _ => ops.push(UpgradeOp::VolumeSize {
                size_gb: requested_gb,
            }),
        }
    }
    if current.node_type != target.node_type {
        ops.push(UpgradeOp::NodeType {
            node_type: target.node_type.clone(),
        });
    }
    if current.is_ha_cluster != target.is_ha_cluster {
        ops.push(UpgradeOp::EnableHa {
            enabled: target.is_ha_cluster,
        });
    }
    if !current.encryption_at_rest && target.encryption_at_rest {
        ops.push(UpgradeOp::EnableEncryption);
    }

    let node_index = ops.iter().position(UpgradeOp::is_node_type);
    let disk_full_block = status == InstanceStatus::DiskFull && target.volume_type.is_block();
    if let Some(node) = node_index.filter(|_| disk_full_block) {
        let size_first = ops
            .iter()
            .position(UpgradeOp::is_volume_size)
            .is_some_and(|size| size < node);
        if !size_first {
            return Err(ProviderError::NodeUpgradeBlockedByDiskFull {
                instance_id: instance_id.to_owned(),
            });
        }
    }
    let to_local = target.volume_type.is_local();
    if let Some(node) = node_index.filter(|index| to_local && *index > 0) {
        let node_op = ops.remove(node);
        ops.insert(0, node_op);
    }
    Ok(ops)
}
