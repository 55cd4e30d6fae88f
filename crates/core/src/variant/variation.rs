//! Transformation pipelines.
//!
//! A pipeline is an ordered list of [`Transformation`]s. Its identity is a
//! signed, non-expiring token over the list; because signing is
//! deterministic, the token (and everything derived from it) is stable for
//! a given pipeline. Order is semantic: resize-then-crop is a different
//! pipeline than crop-then-resize, and encodes differently.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::process::Command;
use tracing::debug;

use stowage_shared::{TokenError, Verifier};

use super::error::VariantError;

/// The external ImageMagick binary applying individual operations.
const CONVERT_BIN: &str = "convert";

/// One named image operation with a single argument, e.g.
/// `resize: "50x50^"`.
///
/// Serializes as a single-entry map (`{"resize":"50x50^"}`) so the signed
/// wire form matches what image tooling conventions expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    /// Operation name, passed to the tool as `-{name}`.
    pub name: String,
    /// Operation argument.
    pub argument: String,
}

impl Transformation {
    /// Creates a transformation.
    #[must_use]
    pub fn new(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }
}

impl Serialize for Transformation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.argument)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Transformation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TransformationVisitor;

        impl<'de> Visitor<'de> for TransformationVisitor {
            type Value = Transformation;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with exactly one operation entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let (name, argument): (String, String) = map
                    .next_entry()?
                    .ok_or_else(|| serde::de::Error::custom("empty operation map"))?;
                if map.next_entry::<String, String>()?.is_some() {
                    return Err(serde::de::Error::custom(
                        "operation map must hold exactly one entry",
                    ));
                }
                Ok(Transformation { name, argument })
            }
        }

        deserializer.deserialize_map(TransformationVisitor)
    }
}

/// Claims signed into a pipeline token.
#[derive(Serialize)]
struct EncodeClaims<'a> {
    transformations: &'a [Transformation],
}

#[derive(Deserialize)]
struct DecodeClaims {
    transformations: Vec<Transformation>,
}

/// Encodes a pipeline as a signed, non-expiring token.
///
/// Byte-identical across calls for the same pipeline; variant keys are
/// hashes of this value.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn encode(verifier: &Verifier, transformations: &[Transformation]) -> Result<String, TokenError> {
    verifier.sign(&EncodeClaims { transformations })
}

/// Decodes a pipeline token back into its ordered transformation list.
///
/// # Errors
///
/// Returns an error if the token fails verification.
pub fn decode(verifier: &Verifier, token: &str) -> Result<Vec<Transformation>, TokenError> {
    let claims: DecodeClaims = verifier.verify(token)?;
    Ok(claims.transformations)
}

/// A working image with the ordered log of operations applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedImage {
    /// Location of the working file.
    pub path: PathBuf,
    /// Names of the operations applied, in application order.
    pub operations: Vec<String>,
}

/// Applies each operation to the image at `image_path`, strictly in
/// pipeline order, rewriting the working file in place.
///
/// Operation N's output is operation N+1's input; a failing step aborts
/// the remainder of the pipeline.
///
/// # Errors
///
/// Returns `VariantError::TransformFailure` with the tool's message if any
/// step fails.
pub async fn transform(
    transformations: &[Transformation],
    image_path: &Path,
) -> Result<TransformedImage, VariantError> {
    transform_with(CONVERT_BIN, transformations, image_path).await
}

async fn transform_with(
    program: &str,
    transformations: &[Transformation],
    image_path: &Path,
) -> Result<TransformedImage, VariantError> {
    let mut image = TransformedImage {
        path: image_path.to_path_buf(),
        operations: Vec::with_capacity(transformations.len()),
    };

    for operation in transformations {
        debug!(name = %operation.name, argument = %operation.argument, "applying operation");
        run_tool(
            program,
            &[
                image.path.as_os_str().to_os_string(),
                format!("-{}", operation.name).into(),
                operation.argument.clone().into(),
                image.path.as_os_str().to_os_string(),
            ],
        )
        .await?;
        image.operations.push(operation.name.clone());
    }

    Ok(image)
}

/// Converts the image at `src` into `dest`, letting the tool pick the
/// output format from the destination extension.
pub(crate) async fn convert_to(src: &Path, dest: &Path) -> Result<(), VariantError> {
    run_tool(
        CONVERT_BIN,
        &[src.as_os_str().to_os_string(), dest.as_os_str().to_os_string()],
    )
    .await
}

async fn run_tool(program: &str, args: &[std::ffi::OsString]) -> Result<(), VariantError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| VariantError::TransformFailure(format!("{program}: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(VariantError::TransformFailure(
            stderr.trim().to_string(),
        ))
    }
}
