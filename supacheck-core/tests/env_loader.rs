use std::fs;

use supacheck_core::{Credentials, EnvMap};
use tempfile::TempDir;

#[test]
fn loads_pairs_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    fs::write(
        &path,
        "SUPABASE_URL=https://abc.supabase.co\nSUPABASE_ANON_KEY=eyJ.hdr.sig==\n# not a pair\n",
    )
    .unwrap();

    let env = EnvMap::load(&path);
    assert_eq!(env.get("SUPABASE_URL"), Some("https://abc.supabase.co"));
    assert_eq!(env.get("SUPABASE_ANON_KEY"), Some("eyJ.hdr.sig=="));
    assert_eq!(env.len(), 2);
}

#[test]
fn missing_file_is_an_empty_map() {
    let dir = TempDir::new().unwrap();
    let env = EnvMap::load(dir.path().join("does-not-exist.env"));
    assert!(env.is_empty());

    let creds = Credentials::from_env(&env);
    assert!(creds.url.is_none());
    assert_eq!(creds.missing().len(), 3);
}

#[test]
fn directory_path_is_an_empty_map() {
    let dir = TempDir::new().unwrap();
    assert!(EnvMap::load(dir.path()).is_empty());
}
