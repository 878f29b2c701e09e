use warden_backend_lib::auth::{CredentialHasher, PasswordError, Verification};
use warden_backend_lib::config::HashingSettings;

fn hasher(log_n: u8) -> CredentialHasher {
    CredentialHasher::new(&HashingSettings {
        log_n,
        r: 8,
        p: 1,
        workers: 1,
    })
    .unwrap()
}

#[test]
fn test_hash_is_salted_and_self_describing() {
    let hasher = hasher(10);
    let first = hasher.hash("correct horse battery staple").unwrap();
    let second = hasher.hash("correct horse battery staple").unwrap();

    assert_ne!(first, second);
    for hash in [&first, &second] {
        assert!(hash.starts_with("$scrypt$ln=10,r=8,p=1$"));
        assert!(!hash.contains("correct horse"));
        assert!(hasher.verify("correct horse battery staple", hash).unwrap());
    }
}

#[test]
fn test_verify_only_accepts_the_exact_secret() {
    let hasher = hasher(10);
    let hash = hasher.hash("Pa55word").unwrap();

    for wrong in ["pa55word", "Pa55word ", " Pa55word", "Pa55wor", "Pa55word\n"] {
        assert!(!hasher.verify(wrong, &hash).unwrap(), "{wrong:?} matched");
    }
    assert!(hasher.verify("Pa55word", &hash).unwrap());
}

#[test]
fn test_unicode_and_long_secrets() {
    let hasher = hasher(10);
    let unicode = "pässwörd-密码-🔑";
    let long = "x".repeat(4096);

    let hash = hasher.hash(unicode).unwrap();
    assert!(hasher.verify(unicode, &hash).unwrap());
    assert!(!hasher.verify("passwörd-密码-🔑", &hash).unwrap());

    let hash = hasher.hash(&long).unwrap();
    assert!(hasher.verify(&long, &hash).unwrap());
    assert!(!hasher.verify(&long[1..], &hash).unwrap());
}

#[test]
fn test_hash_made_at_one_cost_verifies_at_another() {
    let weak = hasher(10).hash("portable").unwrap();
    let strong = hasher(12);

    assert!(strong.verify("portable", &weak).unwrap());
    assert!(strong.needs_rehash(&weak).unwrap());
    assert!(!hasher(10).needs_rehash(&weak).unwrap());
}

#[test]
fn test_upgrade_only_on_match() {
    let weak = hasher(10).hash("upgrade-me").unwrap();
    let strong = hasher(11);

    assert_eq!(
        strong.verify_and_upgrade("nope", &weak).unwrap(),
        Verification::Mismatch
    );
    match strong.verify_and_upgrade("upgrade-me", &weak).unwrap() {
        Verification::Match {
            upgraded: Some(new_hash),
        } => {
            assert!(new_hash.starts_with("$scrypt$ln=11,"));
            assert!(strong.verify("upgrade-me", &new_hash).unwrap());
        },
        other => panic!("expected an upgraded match, got {other:?}"),
    }
}

#[test]
fn test_garbage_hashes_are_malformed_not_mismatches() {
    let hasher = hasher(10);
    let cases = [
        "",
        "not-a-hash",
        "$scrypt$",
        "$scrypt$ln=10,r=8,p=1$",
        "$md5$abc$def",
        "$scrypt$ln=10,r=8,p=1$c2FsdHNhbHQ",
    ];
    for case in cases {
        assert_eq!(
            hasher.verify("secret", case),
            Err(PasswordError::MalformedHash),
            "{case:?}"
        );
    }
}

#[test]
fn test_empty_secret_is_invalid_input() {
    let hasher = hasher(10);
    let hash = hasher.hash("something").unwrap();
    assert_eq!(hasher.hash(""), Err(PasswordError::InvalidInput));
    assert_eq!(hasher.verify("", &hash), Err(PasswordError::InvalidInput));
}

#[test]
fn test_submitted_hash_cannot_demand_unbounded_cost() {
    let hasher = hasher(10);
    // 2^40 blocks would need a petabyte of scrypt memory
    let huge = "$scrypt$ln=40,r=8,p=1$c2FsdHNhbHRzYWx0$ZGlnZXN0ZGlnZXN0ZGlnZXN0";
    assert_eq!(hasher.verify("x", huge), Err(PasswordError::MalformedHash));

    let busy = "$scrypt$ln=10,r=8,p=4096$c2FsdHNhbHRzYWx0$ZGlnZXN0ZGlnZXN0ZGlnZXN0";
    assert_eq!(hasher.verify("x", busy), Err(PasswordError::MalformedHash));

    let argon = "$argon2id$v=19$m=4194304,t=1,p=1$c2FsdHNhbHRzYWx0$ZGlnZXN0ZGlnZXN0ZGlnZXN0";
    assert_eq!(hasher.verify("x", argon), Err(PasswordError::MalformedHash));
}
