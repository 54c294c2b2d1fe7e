//! Identities and versions of the `@link`-style specifications this crate understands:
//! the federation directive set itself, and the `core`/`join` specs used to render a supergraph
//! as portable SDL (§4.3, §6).

use std::fmt;
use std::str::FromStr;

pub const APOLLO_SPEC_DOMAIN: &str = "https://specs.apollo.dev";

/// A `@link`/`@core` feature identity: a domain plus a short name, e.g.
/// `https://specs.apollo.dev/join`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Identity {
    pub domain: String,
    pub name: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.domain, self.name)
    }
}

impl Identity {
    pub fn core() -> Identity {
        Identity {
            domain: APOLLO_SPEC_DOMAIN.to_string(),
            name: "core".to_string(),
        }
    }

    pub fn join() -> Identity {
        Identity {
            domain: APOLLO_SPEC_DOMAIN.to_string(),
            name: "join".to_string(),
        }
    }
}

/// A `major.minor` specification version.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Version { major, minor }
    }

    /// Whether this version can serve a request for `other`: same major version, and at least
    /// as new a minor version.
    pub fn satisfies(&self, other: &Version) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("version number \"{s}\" is missing a dot (.)"))?;
        let major = major
            .parse::<u32>()
            .map_err(|_| format!("invalid major version number in \"{s}\""))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|_| format!("invalid minor version number in \"{s}\""))?;
        Ok(Version { major, minor })
    }
}

/// The supported `core`/`join` feature versions (§6): `core/v0.1` and `join/v0.1`. Anything else
/// must fail ingest with `UNSUPPORTED_FEATURE`.
pub const CORE_VERSION: Version = Version::new(0, 1);
pub const JOIN_VERSION: Version = Version::new(0, 1);

/// A fully-qualified `@link(url: "...")` reference: identity plus version.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SpecUrl {
    pub identity: Identity,
    pub version: Version,
}

impl SpecUrl {
    /// Parses a feature URL of the form `https://specs.apollo.dev/<name>/v<major>.<minor>`.
    pub fn parse(url: &str) -> Result<Self, String> {
        let rest = url
            .strip_prefix(&format!("{APOLLO_SPEC_DOMAIN}/"))
            .ok_or_else(|| format!("unrecognized spec domain in \"{url}\""))?;
        let (name, version) = rest
            .rsplit_once("/v")
            .ok_or_else(|| format!("missing version in spec url \"{url}\""))?;
        Ok(SpecUrl {
            identity: Identity {
                domain: APOLLO_SPEC_DOMAIN.to_string(),
                name: name.to_string(),
            },
            version: version.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feature_url() {
        let url = SpecUrl::parse("https://specs.apollo.dev/join/v0.1").unwrap();
        assert_eq!(url.identity.name, "join");
        assert_eq!(url.version, Version::new(0, 1));
    }

    #[test]
    fn version_satisfies_same_major_newer_minor() {
        assert!(Version::new(0, 2).satisfies(&Version::new(0, 1)));
        assert!(!Version::new(1, 0).satisfies(&Version::new(0, 1)));
        assert!(!Version::new(0, 0).satisfies(&Version::new(0, 1)));
    }
}
