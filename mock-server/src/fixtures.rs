use serde_json::{json, Value};

use crate::Site;

fn html(raw: &str, rendered: &str) -> Value {
    json!({"raw": raw, "rendered": rendered})
}

fn avatars(hash: &str) -> Value {
    json!({
        "24": format!("https://secure.gravatar.com/avatar/{hash}?s=24&d=mm&r=g"),
        "48": format!("https://secure.gravatar.com/avatar/{hash}?s=48&d=mm&r=g"),
        "96": format!("https://secure.gravatar.com/avatar/{hash}?s=96&d=mm&r=g")
    })
}

pub(crate) fn seeded() -> Site {
    let mut site = Site::empty();

    site.insert(
        "users",
        json!({
            "id": 1,
            "username": "admin",
            "name": "Site Admin",
            "first_name": "",
            "last_name": "",
            "email": "admin@wp.test",
            "url": "",
            "description": "",
            "link": "http://wp.test/author/admin/",
            "locale": "en_US",
            "nickname": "admin",
            "slug": "admin",
            "registered_date": "2024-01-01T00:00:00+00:00",
            "roles": ["administrator"],
            "capabilities": {"administrator": true},
            "extra_capabilities": {"administrator": true},
            "avatar_urls": avatars("0a1b2c"),
            "meta": []
        }),
    );
    site.insert(
        "users",
        json!({
            "id": 3,
            "username": "jane",
            "name": "Jane Doe",
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jane@wp.test",
            "url": "https://jane.example",
            "description": "Writes about Rust.",
            "link": "http://wp.test/author/jane/",
            "locale": "en_US",
            "nickname": "jane",
            "slug": "jane",
            "registered_date": "2024-02-01T00:00:00+00:00",
            "roles": ["author"],
            "capabilities": {"author": true},
            "extra_capabilities": {"author": true},
            "avatar_urls": avatars("abc123"),
            "meta": []
        }),
    );

    site.insert(
        "posts",
        json!({
            "id": 7,
            "date": "2024-03-01T12:00:00",
            "date_gmt": "2024-03-01T12:00:00",
            "guid": html("http://wp.test/?p=7", "http://wp.test/?p=7"),
            "link": "http://wp.test/hello/",
            "modified": "2024-03-02T08:00:00",
            "modified_gmt": "2024-03-02T08:00:00",
            "slug": "hello",
            "status": "publish",
            "type": "post",
            "password": "",
            "title": html("Hi", "Hi"),
            "content": json!({"raw": "Body", "rendered": "<p>Body</p>\n", "protected": false}),
            "author": 3,
            "excerpt": json!({"raw": "", "rendered": "<p>Body</p>\n", "protected": false}),
            "featured_media": 12,
            "comment_status": "open",
            "ping_status": "open",
            "format": "standard",
            "meta": [],
            "sticky": false,
            "template": "",
            "categories": [1, 5],
            "tags": [20]
        }),
    );
    site.insert(
        "posts",
        json!({
            "id": 8,
            "date": "2024-03-05T09:30:00",
            "date_gmt": "2024-03-05T09:30:00",
            "guid": html("http://wp.test/?p=8", "http://wp.test/?p=8"),
            "link": "http://wp.test/second-post/",
            "modified": "2024-03-05T09:30:00",
            "modified_gmt": "2024-03-05T09:30:00",
            "slug": "second-post",
            "status": "publish",
            "type": "post",
            "password": "",
            "title": html("Second post", "Second post"),
            "content": json!({"raw": "More", "rendered": "<p>More</p>\n", "protected": false}),
            "author": 1,
            "excerpt": json!({"raw": "", "rendered": "<p>More</p>\n", "protected": false}),
            "featured_media": 0,
            "comment_status": "closed",
            "ping_status": "closed",
            "format": "standard",
            "meta": [],
            "sticky": true,
            "template": "",
            "categories": [1],
            "tags": []
        }),
    );

    site.insert(
        "pages",
        json!({
            "id": 2,
            "date": "2024-01-02T10:00:00",
            "date_gmt": "2024-01-02T10:00:00",
            "link": "http://wp.test/about/",
            "modified": "2024-01-02T10:00:00",
            "modified_gmt": "2024-01-02T10:00:00",
            "slug": "about",
            "status": "publish",
            "type": "page",
            "password": "",
            "parent": 0,
            "title": html("About", "About"),
            "content": json!({"raw": "About us", "rendered": "<p>About us</p>\n", "protected": false}),
            "author": 1,
            "excerpt": json!({"raw": "", "rendered": "", "protected": false}),
            "featured_media": 0,
            "comment_status": "closed",
            "ping_status": "closed",
            "menu_order": 0,
            "meta": [],
            "template": ""
        }),
    );
    site.insert(
        "pages",
        json!({
            "id": 4,
            "date": "2024-01-03T10:00:00",
            "date_gmt": "2024-01-03T10:00:00",
            "link": "http://wp.test/about/team/",
            "modified": "2024-01-03T10:00:00",
            "modified_gmt": "2024-01-03T10:00:00",
            "slug": "team",
            "status": "publish",
            "type": "page",
            "password": "",
            "parent": 2,
            "title": html("Team", "Team"),
            "content": json!({"raw": "Who we are", "rendered": "<p>Who we are</p>\n", "protected": false}),
            "author": 3,
            "excerpt": json!({"raw": "", "rendered": "", "protected": false}),
            "featured_media": 12,
            "comment_status": "closed",
            "ping_status": "closed",
            "menu_order": 1,
            "meta": [],
            "template": ""
        }),
    );

    site.insert(
        "media",
        json!({
            "id": 12,
            "date": "2024-02-28T16:00:00",
            "date_gmt": "2024-02-28T16:00:00",
            "guid": html("http://wp.test/cover.png", "http://wp.test/cover.png"),
            "link": "http://wp.test/hello/cover/",
            "modified": "2024-02-28T16:00:00",
            "modified_gmt": "2024-02-28T16:00:00",
            "slug": "cover",
            "status": "inherit",
            "type": "attachment",
            "title": html("cover", "cover"),
            "author": 3,
            "comment_status": "open",
            "ping_status": "closed",
            "meta": [],
            "template": "",
            "alt_text": "A cover image",
            "caption": html("Cover", "<p>Cover</p>\n"),
            "description": html("", "<p class=\"attachment\"></p>\n"),
            "media_type": "image",
            "mime_type": "image/png",
            "media_details": {"width": 1200, "height": 630, "file": "2024/02/cover.png"},
            "post": 7,
            "source_url": "http://wp.test/wp-content/uploads/2024/02/cover.png"
        }),
    );

    site.insert(
        "categories",
        json!({
            "id": 1,
            "count": 2,
            "description": "",
            "link": "http://wp.test/category/uncategorized/",
            "name": "Uncategorized",
            "slug": "uncategorized",
            "taxonomy": "category",
            "parent": 0,
            "meta": []
        }),
    );
    site.insert(
        "categories",
        json!({
            "id": 5,
            "count": 1,
            "description": "Announcements",
            "link": "http://wp.test/category/news/",
            "name": "News",
            "slug": "news",
            "taxonomy": "category",
            "parent": 0,
            "meta": []
        }),
    );
    site.insert(
        "tags",
        json!({
            "id": 20,
            "count": 1,
            "description": "",
            "link": "http://wp.test/tag/rust/",
            "name": "Rust",
            "slug": "rust",
            "taxonomy": "post_tag",
            "meta": []
        }),
    );

    site.insert(
        "comments",
        json!({
            "id": 30,
            "author": 3,
            "author_email": "jane@wp.test",
            "author_ip": "127.0.0.1",
            "author_name": "Jane Doe",
            "author_url": "https://jane.example",
            "author_user_agent": "curl/8.0",
            "content": html("Nice post", "<p>Nice post</p>\n"),
            "date": "2024-03-01T13:00:00",
            "date_gmt": "2024-03-01T13:00:00",
            "link": "http://wp.test/hello/#comment-30",
            "parent": 0,
            "post": 7,
            "status": "approved",
            "type": "comment",
            "author_avatar_urls": avatars("abc123"),
            "meta": []
        }),
    );
    site.insert(
        "comments",
        json!({
            "id": 31,
            "author": 0,
            "author_email": "guest@example.com",
            "author_ip": "127.0.0.2",
            "author_name": "Guest",
            "author_url": "",
            "author_user_agent": "curl/8.0",
            "content": html("Thanks", "<p>Thanks</p>\n"),
            "date": "2024-03-01T14:00:00",
            "date_gmt": "2024-03-01T14:00:00",
            "link": "http://wp.test/hello/#comment-31",
            "parent": 30,
            "post": 7,
            "status": "approved",
            "type": "comment",
            "author_avatar_urls": avatars("ffffff"),
            "meta": []
        }),
    );

    site.insert(
        "statuses",
        json!({
            "name": "Published",
            "private": false,
            "protected": false,
            "public": true,
            "queryable": true,
            "show_in_list": true,
            "slug": "publish",
            "date_floating": false
        }),
    );
    site.insert(
        "statuses",
        json!({
            "name": "Draft",
            "private": false,
            "protected": true,
            "public": false,
            "queryable": false,
            "show_in_list": true,
            "slug": "draft",
            "date_floating": true
        }),
    );

    site
}
