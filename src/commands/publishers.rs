//! Publisher credential management: `ls-publishers`, `login`, `logout`.

use anyhow::{Result, bail};
use log::debug;

use crate::{
    error::PublishError,
    package::validate_publisher,
    runtime::Runtime,
    store::{CredentialStore, Publisher},
};

use super::config::Config;

pub fn ls_publishers<R: Runtime>(config: &Config<R>) -> Result<()> {
    let publishers = config.store().publishers()?;
    if publishers.is_empty() {
        println!("No publishers known. Run 'vsxpub login <publisher>' to add one.");
        return Ok(());
    }
    for publisher in publishers {
        println!("{}", publisher.name);
    }
    Ok(())
}

/// Store a Personal Access Token for `publisher`, asking before replacing one.
#[tracing::instrument(skip(config))]
pub fn login<R: Runtime>(config: &Config<R>, publisher: &str) -> Result<()> {
    validate_publisher(publisher)?;
    let store = config.store();

    let known = store.publishers()?.iter().any(|p| p.name == publisher);
    if known {
        let answer = config.runtime.prompt(&format!(
            "Publisher '{}' is already known. Do you want to overwrite its PAT? [y/N] ",
            publisher
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            return Err(PublishError::UserAborted.into());
        }
    }

    let pat = config.runtime.prompt(&format!(
        "Personal Access Token for publisher '{}': ",
        publisher
    ))?;
    if pat.is_empty() {
        bail!("No Personal Access Token given for '{}'", publisher);
    }

    store.add_publisher(Publisher {
        name: publisher.to_string(),
        pat,
    })?;
    debug!("Stored token in {:?}", store.path());
    println!("Publisher '{}' is now logged in.", publisher);
    Ok(())
}

#[tracing::instrument(skip(config))]
pub fn logout<R: Runtime>(config: &Config<R>, publisher: &str) -> Result<()> {
    config.store().remove_publisher(publisher)?;
    println!("Publisher '{}' is now logged out.", publisher);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::HttpGalleryConnector;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use reqwest::Client;
    use std::path::{Path, PathBuf};

    const STORE: &str = "/home/user/.vsce";

    fn config(runtime: MockRuntime) -> Config<MockRuntime> {
        Config {
            runtime,
            connector: HttpGalleryConnector::new(Client::new(), None),
            store_path: PathBuf::from(STORE),
            cwd: PathBuf::from("/work"),
        }
    }

    fn with_store(runtime: &mut MockRuntime, content: &'static str) {
        runtime
            .expect_exists()
            .with(eq(Path::new(STORE)))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(Path::new(STORE)))
            .returning(move |_| Ok(content.to_string()));
    }

    #[test]
    fn test_login_new_publisher() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        runtime
            .expect_prompt()
            .withf(|p| p.starts_with("Personal Access Token for publisher 'acme'"))
            .times(1)
            .returning(|_| Ok("token-1".to_string()));
        runtime
            .expect_write()
            .withf(|path, contents| {
                path == Path::new(STORE)
                    && String::from_utf8_lossy(contents).contains("\"token-1\"")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        runtime
            .expect_set_permissions()
            .with(eq(Path::new(STORE)), eq(0o600))
            .times(1)
            .returning(|_, _| Ok(()));

        login(&config(runtime), "acme").unwrap();
    }

    #[test]
    fn test_login_existing_publisher_declined() {
        let mut runtime = MockRuntime::new();
        with_store(
            &mut runtime,
            r#"{"publishers":[{"name":"acme","pat":"old"}]}"#,
        );
        runtime
            .expect_prompt()
            .withf(|p| p.contains("already known"))
            .times(1)
            .returning(|_| Ok("n".to_string()));
        runtime.expect_write().never();

        let err = login(&config(runtime), "acme").unwrap_err();
        assert_eq!(
            err.downcast_ref::<PublishError>(),
            Some(&PublishError::UserAborted)
        );
    }

    #[test]
    fn test_login_empty_token() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        runtime.expect_prompt().returning(|_| Ok(String::new()));
        runtime.expect_write().never();

        assert!(login(&config(runtime), "acme").is_err());
    }

    #[test]
    fn test_login_invalid_publisher() {
        let runtime = MockRuntime::new();
        let err = login(&config(runtime), "not valid").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PublishError>(),
            Some(PublishError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_logout_removes_publisher() {
        let mut runtime = MockRuntime::new();
        with_store(
            &mut runtime,
            r#"{"publishers":[{"name":"acme","pat":"a"},{"name":"other","pat":"b"}]}"#,
        );
        runtime
            .expect_write()
            .withf(|_, contents| {
                let text = String::from_utf8_lossy(contents);
                !text.contains("acme") && text.contains("other")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        runtime.expect_set_permissions().returning(|_, _| Ok(()));

        logout(&config(runtime), "acme").unwrap();
    }

    #[test]
    fn test_logout_unknown_publisher() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        let err = logout(&config(runtime), "acme").unwrap_err();
        assert_eq!(
            err.downcast_ref::<PublishError>(),
            Some(&PublishError::UnknownPublisher("acme".to_string()))
        );
    }

    #[test]
    fn test_ls_publishers() {
        let mut runtime = MockRuntime::new();
        with_store(&mut runtime, r#"{"publishers":[{"name":"acme","pat":"a"}]}"#);
        ls_publishers(&config(runtime)).unwrap();
    }
}
