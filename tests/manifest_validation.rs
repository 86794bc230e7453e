//! Validation for the endpoint manifest (manifest/endpoints.toml).
//!
//! The manifest lists every backend endpoint the crate calls. These tests
//! keep it syntactically valid and in step with the modules that own the
//! calls.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Manifest {
    meta: Meta,
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Meta {
    schema_version: u32,
    last_validated: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Endpoint {
    family: String,
    name: String,
    method: String,
    path: String,
    request_content_type: String,
    response_status: u16,
    module: String,
    implemented: bool,
    #[serde(default)]
    notes: String,
}

fn load_manifest() -> Manifest {
    let content = std::fs::read_to_string("manifest/endpoints.toml")
        .expect("manifest/endpoints.toml should exist and be readable");
    toml::from_str(&content).expect("manifest/endpoints.toml should be valid TOML")
}

#[test]
fn manifest_endpoints_toml_is_valid() {
    let manifest = load_manifest();

    assert!(
        manifest.meta.schema_version >= 1,
        "schema_version must be at least 1"
    );
    assert!(
        !manifest.endpoints.is_empty(),
        "manifest should contain at least one endpoint"
    );

    for ep in &manifest.endpoints {
        assert!(!ep.family.is_empty(), "endpoint family must not be empty");
        assert!(!ep.name.is_empty(), "endpoint name must not be empty");
        assert!(
            ep.path.starts_with("/api/"),
            "endpoint '{}' path must live under /api/",
            ep.name
        );
    }
}

#[test]
fn implemented_endpoints_name_their_module() {
    let manifest = load_manifest();
    let known_modules = ["roundtrip", "cart", "inspect"];

    let implemented: Vec<&Endpoint> = manifest
        .endpoints
        .iter()
        .filter(|ep| ep.implemented)
        .collect();
    assert_eq!(
        implemented.len(),
        6,
        "six backend endpoints are called by the crate"
    );

    for ep in implemented {
        assert!(
            known_modules.contains(&ep.module.as_str()),
            "endpoint '{}' names unknown module '{}'",
            ep.name,
            ep.module
        );
        let source = std::fs::read_to_string(format!("src/{}.rs", ep.module))
            .expect("module source should exist");
        let call_path = ep.path.trim_start_matches('/').split("/{").next().unwrap_or("");
        assert!(
            source.contains(call_path),
            "src/{}.rs should call {}",
            ep.module,
            ep.path
        );
    }
}

#[test]
fn manifest_endpoint_methods_are_valid_http_verbs() {
    let manifest = load_manifest();

    let valid_methods = ["GET", "POST", "PUT", "PATCH", "DELETE"];
    for ep in &manifest.endpoints {
        assert!(
            valid_methods.contains(&ep.method.as_str()),
            "endpoint '{}' has invalid method '{}', expected one of {:?}",
            ep.name,
            ep.method,
            valid_methods
        );
    }
}
