use super::*;

fn account(exp: u64) -> MicrosoftAccount {
    MicrosoftAccount {
        xuid: "xuid-1".into(),
        exp,
        uuid: "uuid-1".into(),
        username: "Steve".into(),
        access_token: "at".into(),
        refresh_token: "rt".into(),
        client_id: "cid".into(),
    }
}

#[test]
fn defaults_match_first_run_settings() {
    let settings = UserSettings::default();
    assert_eq!(settings.username, "DefaultPlayer");
    assert_eq!(settings.allocated_ram, 4.0);
    assert_eq!(settings.auth_method, AuthMethod::Offline);
    assert!(settings.microsoft_account.is_none());
    assert!(settings.client_token.is_none());
}

#[test]
fn merge_is_shallow_and_leaves_unpatched_fields() {
    let base = UserSettings {
        client_token: Some("token".into()),
        ..UserSettings::default()
    };
    let merged = base.merged(&UserSettingsPatch {
        username: Some("Alex".into()),
        ..Default::default()
    });
    assert_eq!(merged.username, "Alex");
    assert_eq!(merged.allocated_ram, base.allocated_ram);
    assert_eq!(merged.client_token.as_deref(), Some("token"));
}

#[test]
fn merge_is_idempotent() {
    let base = UserSettings::default();
    let patch = UserSettingsPatch {
        username: Some("Alex".into()),
        allocated_ram: Some(8.0),
        auth_method: Some(AuthMethod::MicrosoftAccount),
        microsoft_account: Some(Some(account(1234))),
        client_token: None,
    };
    let once = base.merged(&patch);
    let twice = once.merged(&patch);
    assert_eq!(once, twice);
}

#[test]
fn merge_clamps_allocated_ram() {
    let base = UserSettings::default();
    assert_eq!(
        base.merged(&UserSettingsPatch {
            allocated_ram: Some(0.25),
            ..Default::default()
        })
        .allocated_ram,
        MIN_ALLOCATED_RAM_GB
    );
    assert_eq!(
        base.merged(&UserSettingsPatch {
            allocated_ram: Some(512.0),
            ..Default::default()
        })
        .allocated_ram,
        MAX_ALLOCATED_RAM_GB
    );
}

#[test]
fn merge_can_clear_the_account() {
    let base = UserSettings {
        auth_method: AuthMethod::MicrosoftAccount,
        microsoft_account: Some(account(1234)),
        ..UserSettings::default()
    };
    let merged = base.merged(&UserSettingsPatch {
        auth_method: Some(AuthMethod::Offline),
        microsoft_account: Some(None),
        ..Default::default()
    });
    assert!(merged.microsoft_account.is_none());
    assert_eq!(merged.auth_method, AuthMethod::Offline);
}

#[test]
fn settings_blob_uses_camel_case_keys() {
    let settings = UserSettings {
        microsoft_account: Some(account(99)),
        client_token: Some("tok".into()),
        ..UserSettings::default()
    };
    let json = serde_json::to_value(&settings).unwrap();
    assert!(json.get("allocatedRam").is_some());
    assert!(json.get("authMethod").is_some());
    assert!(json.get("clientToken").is_some());
    let account_json = json.get("microsoftAccount").unwrap();
    assert!(account_json.get("accessToken").is_some());
    assert!(account_json.get("refreshToken").is_some());
}

#[test]
fn partial_blob_deserializes_over_defaults() {
    let settings: UserSettings = serde_json::from_str(r#"{"username":"Alex"}"#).unwrap();
    assert_eq!(settings.username, "Alex");
    assert_eq!(settings.allocated_ram, 4.0);
    assert_eq!(settings.auth_method, AuthMethod::Offline);
}

#[test]
fn launch_profile_passes_account_and_token_verbatim() {
    let settings = UserSettings {
        auth_method: AuthMethod::MicrosoftAccount,
        microsoft_account: Some(account(7)),
        client_token: Some("install-token".into()),
        ..UserSettings::default()
    };
    let profile = LaunchProfile::from(&settings);
    assert_eq!(profile.microsoft_account, settings.microsoft_account);
    assert_eq!(profile.client_token.as_deref(), Some("install-token"));

    let offline = LaunchProfile::from(&UserSettings::default());
    assert!(offline.microsoft_account.is_none());
    assert!(offline.client_token.is_none());
}
