//! Value types carried by edit-log operations and events.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A block of file data, as recorded by add/close/update operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block identifier.
    pub block_id: u64,
    /// Number of bytes stored in the block.
    pub num_bytes: u64,
    /// Generation stamp of the block.
    pub generation_stamp: u64,
}

impl Block {
    /// Creates a new block descriptor.
    pub fn new(block_id: u64, num_bytes: u64, generation_stamp: u64) -> Self {
        Self {
            block_id,
            num_bytes,
            generation_stamp,
        }
    }

    /// Total length of a list of blocks.
    pub fn total_len(blocks: &[Block]) -> u64 {
        blocks.iter().map(|b| b.num_bytes).sum()
    }
}

/// Read/write/execute permission triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FsAction {
    /// `---`
    None,
    /// `--x`
    Execute,
    /// `-w-`
    Write,
    /// `-wx`
    WriteExecute,
    /// `r--`
    Read,
    /// `r-x`
    ReadExecute,
    /// `rw-`
    ReadWrite,
    /// `rwx`
    All,
}

impl FsAction {
    /// Builds an action from its three low bits (`r=4`, `w=2`, `x=1`).
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0o7 {
            0 => FsAction::None,
            1 => FsAction::Execute,
            2 => FsAction::Write,
            3 => FsAction::WriteExecute,
            4 => FsAction::Read,
            5 => FsAction::ReadExecute,
            6 => FsAction::ReadWrite,
            _ => FsAction::All,
        }
    }

    /// Returns the three permission bits.
    pub fn bits(&self) -> u8 {
        match self {
            FsAction::None => 0,
            FsAction::Execute => 1,
            FsAction::Write => 2,
            FsAction::WriteExecute => 3,
            FsAction::Read => 4,
            FsAction::ReadExecute => 5,
            FsAction::ReadWrite => 6,
            FsAction::All => 7,
        }
    }

    /// Returns the `rwx` symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            FsAction::None => "---",
            FsAction::Execute => "--x",
            FsAction::Write => "-w-",
            FsAction::WriteExecute => "-wx",
            FsAction::Read => "r--",
            FsAction::ReadExecute => "r-x",
            FsAction::ReadWrite => "rw-",
            FsAction::All => "rwx",
        }
    }

    /// Parses an `rwx` symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let bytes = symbol.as_bytes();
        if bytes.len() != 3 {
            return None;
        }
        let mut bits = 0u8;
        for (i, (&actual, expected)) in bytes.iter().zip([b'r', b'w', b'x']).enumerate() {
            if actual == expected {
                bits |= 4 >> i;
            } else if actual != b'-' {
                return None;
            }
        }
        Some(Self::from_bits(bits))
    }
}

impl fmt::Display for FsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// POSIX-style permission bits of an inode (`0o1777` range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FsPermission(u16);

impl FsPermission {
    const STICKY: u16 = 0o1000;

    /// Creates a permission from a mode, dropping bits above the sticky bit.
    pub fn from_mode(mode: u16) -> Self {
        Self(mode & 0o1777)
    }

    /// Returns the raw mode bits.
    pub fn mode(&self) -> u16 {
        self.0
    }

    /// Owner permissions.
    pub fn user_action(&self) -> FsAction {
        FsAction::from_bits((self.0 >> 6) as u8)
    }

    /// Group permissions.
    pub fn group_action(&self) -> FsAction {
        FsAction::from_bits((self.0 >> 3) as u8)
    }

    /// Permissions for everyone else.
    pub fn other_action(&self) -> FsAction {
        FsAction::from_bits(self.0 as u8)
    }

    /// Whether the sticky bit is set.
    pub fn sticky(&self) -> bool {
        self.0 & Self::STICKY != 0
    }

    /// Parses a symbolic permission such as `rw-r--r--` or `-rw-rw-rw-`.
    ///
    /// A ten character form has a leading file type character which is
    /// ignored. The last position may be `t` or `T` for the sticky bit.
    pub fn from_symbolic(symbolic: &str) -> ProtocolResult<Self> {
        let body = match symbolic.len() {
            9 => symbolic,
            10 => symbolic.get(1..).unwrap_or_default(),
            _ => return Err(ProtocolError::InvalidPermission(symbolic.to_string())),
        };
        let invalid = || ProtocolError::InvalidPermission(symbolic.to_string());

        let other = body.get(6..9).ok_or_else(invalid)?;
        let (other, sticky) = if let Some(rw) = other.strip_suffix('t') {
            (format!("{rw}x"), true)
        } else if let Some(rw) = other.strip_suffix('T') {
            (format!("{rw}-"), true)
        } else {
            (other.to_string(), false)
        };

        let user = FsAction::from_symbol(body.get(0..3).ok_or_else(invalid)?).ok_or_else(invalid)?;
        let group =
            FsAction::from_symbol(body.get(3..6).ok_or_else(invalid)?).ok_or_else(invalid)?;
        let other = FsAction::from_symbol(&other).ok_or_else(invalid)?;

        let mut mode = (u16::from(user.bits()) << 6)
            | (u16::from(group.bits()) << 3)
            | u16::from(other.bits());
        if sticky {
            mode |= Self::STICKY;
        }
        Ok(Self(mode))
    }
}

impl fmt::Display for FsPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let other = self.other_action().symbol();
        write!(f, "{}{}", self.user_action(), self.group_action())?;
        if self.sticky() {
            let exec = if other.ends_with('x') { 't' } else { 'T' };
            write!(f, "{}{}", &other[..2], exec)
        } else {
            f.write_str(other)
        }
    }
}

impl FromStr for FsPermission {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbolic(s)
    }
}

/// Owner, group and mode recorded when an inode is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatus {
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// Permission bits.
    pub permission: FsPermission,
}

impl PermissionStatus {
    /// Creates a new permission status.
    pub fn new(owner: impl Into<String>, group: impl Into<String>, permission: FsPermission) -> Self {
        Self {
            owner: owner.into(),
            group: group.into(),
            permission,
        }
    }
}

/// Whether an ACL entry applies to the inode itself or is inherited by children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AclEntryScope {
    /// Applies to the inode.
    Access,
    /// Default ACL inherited by new children of a directory.
    Default,
}

/// Kind of principal an ACL entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AclEntryType {
    /// A user (owner when unnamed).
    User,
    /// A group (owning group when unnamed).
    Group,
    /// Mask limiting named entries and the group entry.
    Mask,
    /// Everyone else.
    Other,
}

impl AclEntryType {
    fn keyword(&self) -> &'static str {
        match self {
            AclEntryType::User => "user",
            AclEntryType::Group => "group",
            AclEntryType::Mask => "mask",
            AclEntryType::Other => "other",
        }
    }
}

/// One entry of an access control list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    /// Access or default scope.
    pub scope: AclEntryScope,
    /// Principal kind.
    pub entry_type: AclEntryType,
    /// Principal name, absent for the owner/owning group/mask/other entries.
    pub name: Option<String>,
    /// Granted permissions.
    pub permission: FsAction,
}

impl AclEntry {
    /// Creates an access-scope entry.
    pub fn access(entry_type: AclEntryType, name: Option<&str>, permission: FsAction) -> Self {
        Self {
            scope: AclEntryScope::Access,
            entry_type,
            name: name.map(str::to_string),
            permission,
        }
    }

    /// Parses a single entry such as `user:foo:rw-` or `default:group::r-x`.
    pub fn parse(spec: &str) -> ProtocolResult<Self> {
        let invalid = || ProtocolError::InvalidAclSpec(spec.to_string());
        let mut parts: Vec<&str> = spec.trim().split(':').collect();

        let scope = if parts.first() == Some(&"default") {
            parts.remove(0);
            AclEntryScope::Default
        } else {
            AclEntryScope::Access
        };

        let [kind, name, perm] = parts.as_slice() else {
            return Err(invalid());
        };

        let entry_type = match *kind {
            "user" => AclEntryType::User,
            "group" => AclEntryType::Group,
            "mask" => AclEntryType::Mask,
            "other" => AclEntryType::Other,
            _ => return Err(invalid()),
        };

        let name = match *name {
            "" => None,
            _ if matches!(entry_type, AclEntryType::Mask | AclEntryType::Other) => {
                return Err(invalid())
            }
            n => Some(n.to_string()),
        };

        let permission = FsAction::from_symbol(perm).ok_or_else(invalid)?;

        Ok(Self {
            scope,
            entry_type,
            name,
            permission,
        })
    }

    /// Parses a comma separated ACL spec.
    pub fn parse_spec(spec: &str) -> ProtocolResult<Vec<Self>> {
        spec.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope == AclEntryScope::Default {
            f.write_str("default:")?;
        }
        write!(
            f,
            "{}:{}:{}",
            self.entry_type.keyword(),
            self.name.as_deref().unwrap_or(""),
            self.permission
        )
    }
}

/// Namespace of an extended attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XAttrNamespace {
    /// `user.`
    User,
    /// `trusted.`
    Trusted,
    /// `security.`
    Security,
    /// `system.`
    System,
    /// `raw.`
    Raw,
}

impl XAttrNamespace {
    fn prefix(&self) -> &'static str {
        match self {
            XAttrNamespace::User => "user",
            XAttrNamespace::Trusted => "trusted",
            XAttrNamespace::Security => "security",
            XAttrNamespace::System => "system",
            XAttrNamespace::Raw => "raw",
        }
    }
}

/// An extended attribute attached to an inode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XAttr {
    /// Attribute namespace.
    pub namespace: XAttrNamespace,
    /// Attribute name without the namespace prefix.
    pub name: String,
    /// Attribute value; removal records carry no value.
    pub value: Option<Vec<u8>>,
}

impl XAttr {
    /// Builds an attribute from a prefixed name such as `user.field`.
    pub fn from_prefixed_name(prefixed: &str, value: Option<Vec<u8>>) -> ProtocolResult<Self> {
        let invalid = || ProtocolError::InvalidXAttrName(prefixed.to_string());
        let (prefix, name) = prefixed.split_once('.').ok_or_else(invalid)?;
        if name.is_empty() {
            return Err(invalid());
        }

        let namespace = match prefix.to_ascii_lowercase().as_str() {
            "user" => XAttrNamespace::User,
            "trusted" => XAttrNamespace::Trusted,
            "security" => XAttrNamespace::Security,
            "system" => XAttrNamespace::System,
            "raw" => XAttrNamespace::Raw,
            _ => return Err(invalid()),
        };

        Ok(Self {
            namespace,
            name: name.to_string(),
            value,
        })
    }

    /// Returns the name including its namespace prefix.
    pub fn prefixed_name(&self) -> String {
        format!("{}.{}", self.namespace.prefix(), self.name)
    }
}
