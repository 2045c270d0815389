pub mod box_value;
pub mod id;
pub mod init;
pub mod sign;
pub mod tag;
pub mod unbox;
pub mod verify;
pub mod version;

pub use box_value::BoxValue;
pub use id::Id;
pub use init::Init;
pub use sign::Sign;
pub use tag::Tag;
pub use unbox::Unbox;
pub use verify::Verify;
pub use version::Version;

/// Parse a JSON argument
pub(crate) fn parse_json(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::from_str(raw)
}
