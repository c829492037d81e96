//! Well-known record types and attribute names.
//!
//! These are the standard identifiers understood by the native directory
//! layer. Callers are free to pass any string; the constants here cover the
//! common cases so call sites avoid typos.

/// Wildcard record-name filter matching every record of the requested types.
pub const ALL_RECORDS: &str = "dsRecordsAll";

/// Standard user records.
pub const RECORD_TYPE_USERS: &str = "dsRecTypeStandard:Users";
/// Standard group records.
pub const RECORD_TYPE_GROUPS: &str = "dsRecTypeStandard:Groups";
/// Standard resource records (rooms, projectors).
pub const RECORD_TYPE_RESOURCES: &str = "dsRecTypeStandard:Resources";
/// Standard computer records.
pub const RECORD_TYPE_COMPUTERS: &str = "dsRecTypeStandard:Computers";

/// Record name attribute.
pub const ATTR_RECORD_NAME: &str = "dsAttrTypeStandard:RecordName";
/// Generated unique identifier attribute.
pub const ATTR_GENERATED_UID: &str = "dsAttrTypeStandard:GeneratedUID";
/// Last modification timestamp attribute.
pub const ATTR_MODIFICATION_TIMESTAMP: &str = "dsAttrTypeStandard:ModificationTimestamp";
/// The directory node a record's authentication authority lives on.
pub const ATTR_META_NODE_LOCATION: &str = "dsAttrTypeStandard:AppleMetaNodeLocation";
/// Group membership attribute.
pub const ATTR_GROUP_MEMBERS: &str = "dsAttrTypeStandard:GroupMembership";
