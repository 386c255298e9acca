//! Handler-chain tests: hidden-file filter, welcome files, framework
//! rewrites, and the script response streamer.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::sync::Arc;

    use skiff_core::{
        EngineError, RequestTransport, ScriptEngine, ScriptRequest, DEFAULT_BUFFER_SIZE,
    };
    use skiff_http::script;
    use skiff_http::security::is_hidden_path;
    use skiff_http::{FrameworkRewrites, Resolution, WelcomeFiles};

    // ─────────────────────────────────────────────────────────────────────
    // Hidden-file filter
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn dotted_segments_are_hidden() {
        assert!(is_hidden_path("/.env"));
        assert!(is_hidden_path("/app/.git/config"));
        assert!(is_hidden_path("/a/../secret"));
        assert!(!is_hidden_path("/index.html"));
        assert!(!is_hidden_path("/docs/readme.md"));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Welcome files
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn directory_without_slash_redirects() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("docs")).unwrap();

        let welcome = WelcomeFiles::new(&[]);
        assert_eq!(
            welcome.resolve(root.path(), "/docs"),
            Some(Resolution::Redirect("/docs/".into()))
        );
    }

    #[test]
    fn directory_with_slash_picks_first_existing_welcome_file() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("index.htm"), "<html></html>").unwrap();

        // index.html is tried first but does not exist here.
        let welcome = WelcomeFiles::new(&[]);
        assert_eq!(
            welcome.resolve(root.path(), "/"),
            Some(Resolution::Rewrite("/index.htm".into()))
        );
    }

    #[test]
    fn script_extension_adds_a_welcome_candidate() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("index.bxm"), "").unwrap();

        let welcome = WelcomeFiles::new(&["bxm".to_string()]);
        assert_eq!(
            welcome.resolve(root.path(), "/"),
            Some(Resolution::Rewrite("/index.bxm".into()))
        );
    }

    #[test]
    fn plain_file_and_empty_directory_pass_through() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("page.html"), "hi").unwrap();
        fs::create_dir(root.path().join("empty")).unwrap();

        let welcome = WelcomeFiles::new(&[]);
        assert_eq!(welcome.resolve(root.path(), "/page.html"), None);
        assert_eq!(welcome.resolve(root.path(), "/empty/"), None);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Framework rewrites
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn missing_paths_are_rewritten_to_the_front_controller() {
        let root = tempfile::tempdir().unwrap();
        let rewrites = FrameworkRewrites::new("index.bxm", &["bxm".to_string()], "/ws");
        assert_eq!(
            rewrites.apply(root.path(), "/users/42"),
            Some("/index.bxm/users/42".into())
        );
    }

    #[test]
    fn claimed_paths_are_left_alone() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("real.txt"), "x").unwrap();

        let rewrites = FrameworkRewrites::new("index.bxm", &["bxm".to_string()], "/ws");
        assert_eq!(rewrites.apply(root.path(), "/ws"), None);
        assert_eq!(rewrites.apply(root.path(), "/ws/chat"), None);
        assert_eq!(rewrites.apply(root.path(), "/favicon.ico"), None);
        assert_eq!(rewrites.apply(root.path(), "/admin.bxm"), None);
        assert_eq!(rewrites.apply(root.path(), "/real.txt"), None);
        assert_eq!(rewrites.apply(root.path(), "/"), None);
    }

    #[test]
    fn the_configured_socket_path_is_excluded() {
        let root = tempfile::tempdir().unwrap();
        let rewrites = FrameworkRewrites::new("index.bxm", &["bxm".to_string()], "/socket");
        assert_eq!(rewrites.apply(root.path(), "/socket"), None);
        assert_eq!(rewrites.apply(root.path(), "/socket/room"), None);
        // A relocated endpoint frees up the default path.
        assert_eq!(
            rewrites.apply(root.path(), "/ws"),
            Some("/index.bxm/ws".into())
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Script response streaming
    // ─────────────────────────────────────────────────────────────────────

    struct BodyEngine {
        body: Vec<u8>,
        fail: bool,
    }

    impl ScriptEngine for BodyEngine {
        fn handle(
            &self,
            _request: &ScriptRequest,
            out: &mut dyn Write,
        ) -> Result<(), EngineError> {
            if self.fail {
                return Err(EngineError::script("no such template"));
            }
            out.write_all(&self.body)?;
            Ok(())
        }

        fn extensions(&self) -> &[String] {
            &[]
        }
    }

    fn http_request(target: &str) -> ScriptRequest {
        ScriptRequest {
            method: http::Method::GET,
            target: target.to_string(),
            headers: http::HeaderMap::new(),
            source: None,
            destination: None,
            transport: RequestTransport::Http,
            attachment: None,
        }
    }

    #[tokio::test]
    async fn script_body_streams_out_intact() {
        // Larger than the writer's staging buffer so the body spans several
        // flushes.
        let body: Vec<u8> = (0..DEFAULT_BUFFER_SIZE * 3 + 17).map(|i| (i % 256) as u8).collect();
        let engine = Arc::new(BodyEngine { body: body.clone(), fail: false });

        let response = script::execute(engine, http_request("/page.bxm")).await;
        assert_eq!(response.status(), http::StatusCode::OK);

        let got = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(got.as_ref(), body.as_slice());
    }

    #[tokio::test]
    async fn script_failure_before_output_is_a_500() {
        let engine = Arc::new(BodyEngine { body: vec![], fail: true });
        let response = script::execute(engine, http_request("/broken.bxm")).await;
        assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn empty_script_output_is_an_empty_200() {
        let engine = Arc::new(BodyEngine { body: vec![], fail: false });
        let response = script::execute(engine, http_request("/empty.bxm")).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let got = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(got.is_empty());
    }
}
