//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port so writes do not
//! leak between tests, then drives the facade over real HTTP with the `ureq`
//! transport. A counting wrapper records how many requests reach the wire,
//! which is how cache hits and embedded resources are observed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wp_orm::{
    Api, ApiError, Context, HttpRequest, HttpResponse, Lookup, Tag, Transport, TransportError,
    UreqTransport, User,
};

/// Start the mock server on a random port and return its API root.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}{}", mock_server::API_ROOT)
}

#[derive(Default)]
struct Counting {
    inner: UreqTransport,
    calls: AtomicUsize,
}

impl Counting {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for Counting {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(request)
    }
}

fn counted(base_url: &str, admin: bool) -> (Api, Arc<Counting>) {
    let transport = Arc::new(Counting::default());
    let mut builder = Api::builder(base_url).transport(transport.clone());
    if admin {
        builder = builder.basic_auth("admin", "secret");
    }
    (builder.build().unwrap(), transport)
}

#[test]
fn post_with_embedded_relations() {
    let base_url = start_server();
    let (api, wire) = counted(&base_url, false);

    // Step 1: one request brings the post and everything it embeds.
    let post = api.post(7).unwrap();
    assert_eq!(wire.calls(), 1);
    {
        let fields = post.read();
        assert_eq!(fields.title.as_deref(), Some("Hi"));
        assert_eq!(fields.content.as_deref(), Some("<p>Body</p>\n"));
        assert_eq!(fields.categories.as_deref(), Some(&[1, 5][..]));
    }

    // Step 2: slug lookup and relations are served from the cache.
    assert!(Arc::ptr_eq(&post, &api.post(Lookup::by_slug("hello")).unwrap()));
    let author = post.resolve_author().unwrap().unwrap();
    assert_eq!(author.slug().as_deref(), Some("jane"));
    let categories = post.resolve_categories().unwrap();
    let slugs: Vec<_> = categories.iter().filter_map(|c| c.slug()).collect();
    assert_eq!(slugs, ["uncategorized", "news"]);
    let tags = post.resolve_tags().unwrap();
    assert_eq!(tags[0].read().name.as_deref(), Some("Rust"));
    let media = post.resolve_featured_media().unwrap().unwrap();
    assert_eq!(media.slug().as_deref(), Some("cover"));
    assert_eq!(wire.calls(), 1);

    // Step 3: comments need one list request and reuse the embedded replies.
    let comments = post.resolve_comments().unwrap();
    assert_eq!(wire.calls(), 2);
    assert_eq!(comments.len(), 2);
    let reply = comments.iter().find(|c| c.remote_id() == Some(31)).unwrap();
    let parent = reply.resolve_parent().unwrap().unwrap();
    assert_eq!(parent.remote_id(), Some(30));
    assert!(reply.resolve_author().unwrap().is_none(), "guest comment");
    assert!(Arc::ptr_eq(&reply.resolve_post().unwrap().unwrap(), &post));
    assert_eq!(wire.calls(), 2);
}

#[test]
fn page_hierarchy_and_user_lookup() {
    let base_url = start_server();
    let (api, wire) = counted(&base_url, false);

    let team = api.page(Lookup::by_slug("team")).unwrap();
    let about = team.resolve_parent().unwrap().unwrap();
    assert_eq!(about.slug().as_deref(), Some("about"));
    assert!(about.resolve_parent().unwrap().is_none());
    assert_eq!(wire.calls(), 1);

    let embedded_author = api.cache().get::<User>(3).unwrap();
    let jane = api.user(Lookup::by_username("jane")).unwrap();
    assert!(Arc::ptr_eq(&jane, &embedded_author));
    assert_eq!(jane.read().name.as_deref(), Some("Jane Doe"));
    assert_eq!(wire.calls(), 2);

    let news = api.category(Lookup::by_name("news")).unwrap();
    let posts = news.resolve_posts().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug().as_deref(), Some("hello"));
}

#[test]
fn counts_and_statuses() {
    let base_url = start_server();
    let (api, _) = counted(&base_url, false);

    assert_eq!(api.post_request().count().unwrap(), 2);
    assert_eq!(api.comment_request().count().unwrap(), 2);

    let mut paged = api.post_request();
    paged.per_page(1).unwrap();
    let first_page = paged.get().unwrap();
    assert_eq!(first_page.len(), 1);
    assert_eq!(paged.total(), Some(2));
    assert_eq!(paged.total_pages(), Some(2));

    let publish = api.post_status("publish").unwrap();
    assert_eq!(publish.read().name.as_deref(), Some("Published"));
    let statuses = api.post_status_request().get().unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().any(|status| Arc::ptr_eq(status, &publish)));
}

#[test]
fn server_errors_surface_as_typed_errors() {
    let base_url = start_server();
    let (api, _) = counted(&base_url, false);

    assert!(api.post(999).unwrap_err().is_not_found());
    assert!(api.tag(Lookup::by_slug("missing")).unwrap_err().is_not_found());

    let err = api.post_request().page(9).unwrap().get().unwrap_err();
    match err {
        ApiError::BadRequest { payload } => {
            assert_eq!(payload["code"], "rest_post_invalid_page_number")
        }
        other => panic!("expected BadRequest, got {other:?}"),
    }

    let err = api
        .user_request()
        .context(Context::Edit)
        .unwrap()
        .get()
        .unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationRequired { status: 401, .. }));

    let draft = Tag {
        name: Some("Go".to_string()),
        ..Tag::default()
    };
    assert!(matches!(
        api.create(&draft),
        Err(ApiError::AuthenticationRequired { .. })
    ));
}

#[test]
fn create_and_update_with_credentials() {
    let base_url = start_server();
    let (api, wire) = counted(&base_url, true);

    let draft = Tag {
        name: Some("Go".to_string()),
        ..Tag::default()
    };
    let tag = api.create(&draft).unwrap();
    assert_eq!(tag.remote_id(), Some(21));
    assert_eq!(tag.slug().as_deref(), Some("go"));
    assert!(Arc::ptr_eq(&tag, &api.tag(Lookup::by_slug("go")).unwrap()));
    assert_eq!(wire.calls(), 1);

    tag.edit(|fields| fields.description = Some("Gophers".to_string()));
    let updated = api.update(&tag).unwrap();
    assert!(Arc::ptr_eq(&tag, &updated));
    assert_eq!(updated.read().description.as_deref(), Some("Gophers"));

    let mut request = api.tag_request();
    request.id(21).unwrap().context(Context::Edit).unwrap();
    let fetched = request.get().unwrap();
    assert_eq!(fetched[0].read().description.as_deref(), Some("Gophers"));

    let jane = api
        .user_request()
        .context(Context::Edit)
        .unwrap()
        .search("jane")
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(jane[0].read().email.as_deref(), Some("jane@wp.test"));
}

#[test]
fn session_reuses_one_agent() {
    let base_url = start_server();
    let api = Api::new(&base_url).unwrap();

    let slugs = api.with_session(|api| {
        assert!(api.in_session());
        let posts = api.post_request().get().unwrap();
        let page = api.page(2).unwrap();
        posts
            .iter()
            .filter_map(|post| post.slug())
            .chain(page.slug())
            .collect::<Vec<_>>()
    });

    assert!(!api.in_session());
    assert_eq!(slugs, ["hello", "second-post", "about"]);
}
