// src/nuspec.rs

//! Package manifest (`.nuspec`) access.
//!
//! A `.nupkg` is a zip archive carrying exactly one root-level `.nuspec`
//! entry, an XML document describing the package. The manifest is parsed in
//! a streaming fashion; a manifest that fails to parse marks the whole
//! document invalid.

use crate::error::{Error, Result};
use crate::version::NuGetVersion;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

/// One `<dependency>` element from the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuspecDependency {
    pub id: String,
    /// Raw version-range expression, e.g. `[1.0.0, 2.0.0)`
    pub version_range: Option<String>,
    /// Target framework of the enclosing `<group>`, if any
    pub target_framework: Option<String>,
}

/// Parsed package manifest
#[derive(Debug, Clone)]
pub struct Nuspec {
    pub id: String,
    pub version: NuGetVersion,
    pub description: Option<String>,
    pub authors: Option<String>,
    pub dependencies: Vec<NuspecDependency>,
}

impl Nuspec {
    /// Parse a manifest from a file on disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }

    /// Parse a manifest from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R, source: &str) -> Result<Self> {
        let mut xml = Reader::from_reader(reader);
        xml.config_mut().trim_text(true);

        let invalid = |reason: String| Error::ContentInvalid {
            uri: source.to_string(),
            reason,
        };

        let mut buf = Vec::new();
        // Element path below <package>, lowercased local names
        let mut path: Vec<String> = Vec::new();
        let mut id = None;
        let mut version_str = None;
        let mut description = None;
        let mut authors = None;
        let mut dependencies = Vec::new();
        let mut current_group: Option<String> = None;

        loop {
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    if name == "group" && path.last().map(String::as_str) == Some("dependencies") {
                        current_group = attribute(e, "targetFramework")
                            .map_err(|r| invalid(r))?;
                    }
                    // Dependencies are usually self-closing but may carry
                    // children
                    if name == "dependency"
                        && let Some(dep_id) = attribute(e, "id").map_err(|r| invalid(r))?
                    {
                        dependencies.push(NuspecDependency {
                            id: dep_id,
                            version_range: attribute(e, "version").map_err(|r| invalid(r))?,
                            target_framework: current_group.clone(),
                        });
                    }
                    path.push(name);
                }
                Ok(Event::Empty(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    if name == "dependency" {
                        let dep_id = attribute(e, "id").map_err(|r| invalid(r))?;
                        if let Some(dep_id) = dep_id {
                            dependencies.push(NuspecDependency {
                                id: dep_id,
                                version_range: attribute(e, "version").map_err(|r| invalid(r))?,
                                target_framework: current_group.clone(),
                            });
                        }
                    }
                }
                Ok(Event::Text(ref t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| invalid(format!("bad text node: {e}")))?
                        .to_string();
                    match path.as_slice() {
                        [p, m, leaf] if p == "package" && m == "metadata" => match leaf.as_str() {
                            "id" => id = Some(text),
                            "version" => version_str = Some(text),
                            "description" => description = Some(text),
                            "authors" => authors = Some(text),
                            _ => {}
                        },
                        _ => {}
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                    if name == "group" {
                        current_group = None;
                    }
                    path.pop();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(invalid(format!("XML parse error: {e}"))),
            }
            buf.clear();
        }

        let id = id.ok_or_else(|| invalid("manifest missing <id>".to_string()))?;
        let version_str =
            version_str.ok_or_else(|| invalid("manifest missing <version>".to_string()))?;
        let version = NuGetVersion::parse(&version_str)?;

        Ok(Self {
            id,
            version,
            description,
            authors,
            dependencies,
        })
    }
}

/// Read one attribute by case-insensitive local name
fn attribute(
    e: &quick_xml::events::BytesStart<'_>,
    name: &str,
) -> std::result::Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| format!("bad attribute: {e}"))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_lowercase();
        if key == name.to_lowercase() {
            let value = attr
                .unescape_value()
                .map_err(|e| format!("bad attribute value: {e}"))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

/// Locate the root-level `.nuspec` entry name inside a `.nupkg`
///
/// Doubles as archive validation: an archive that fails to open or lacks a
/// manifest entry is malformed.
pub fn find_nuspec_entry(archive_path: &Path) -> Result<String> {
    let file = File::open(archive_path)?;
    let archive = ZipArchive::new(file).map_err(|e| Error::ContentInvalid {
        uri: archive_path.display().to_string(),
        reason: format!("not a zip archive: {e}"),
    })?;

    archive
        .file_names()
        .find(|name| !name.contains('/') && name.to_lowercase().ends_with(".nuspec"))
        .map(str::to_string)
        .ok_or_else(|| Error::ContentInvalid {
            uri: archive_path.display().to_string(),
            reason: "archive has no .nuspec entry".to_string(),
        })
}

/// Extract the manifest entry from an archive into `dest`
pub fn extract_nuspec(archive_path: &Path, dest: &Path) -> Result<()> {
    let entry_name = find_nuspec_entry(archive_path)?;
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| Error::ContentInvalid {
        uri: archive_path.display().to_string(),
        reason: format!("not a zip archive: {e}"),
    })?;

    let mut entry = archive
        .by_name(&entry_name)
        .map_err(|e| Error::ContentInvalid {
            uri: archive_path.display().to_string(),
            reason: format!("cannot read {entry_name}: {e}"),
        })?;

    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;

    let tmp = dest.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, dest)?;
    Ok(())
}

/// Parse the manifest straight out of an archive
pub fn read_nuspec_from_archive(archive_path: &Path) -> Result<Nuspec> {
    let entry_name = find_nuspec_entry(archive_path)?;
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| Error::ContentInvalid {
        uri: archive_path.display().to_string(),
        reason: format!("not a zip archive: {e}"),
    })?;

    let mut entry = archive
        .by_name(&entry_name)
        .map_err(|e| Error::ContentInvalid {
            uri: archive_path.display().to_string(),
            reason: format!("cannot read {entry_name}: {e}"),
        })?;

    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Nuspec::from_reader(
        BufReader::new(bytes.as_slice()),
        &archive_path.display().to_string(),
    )
}
