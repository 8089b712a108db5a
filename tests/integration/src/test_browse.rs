//! Listing and navigation through the gateway.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use reqwest::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};

    use crate::{cleanup_bucket, create_test_bucket, gateway_url, http_client, put, s3_client};

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_report_health() {
        let resp = http_client()
            .get(format!("{}/_health", gateway_url()))
            .send()
            .await
            .expect("health");
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_list_buckets() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "buckets").await;

        let resp = http_client()
            .get(format!("{}/", gateway_url()))
            .send()
            .await
            .expect("root");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(
            resp.headers()[CONTENT_TYPE]
                .to_str()
                .expect("ascii")
                .starts_with("text/html")
        );
        let html = resp.text().await.expect("body");
        assert!(html.contains(&format!("href=\"/{bucket}/\"")));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_list_prefixes_and_objects() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "browse").await;
        put(&client, &bucket, "docs/readme.txt", b"hello").await;
        put(&client, &bucket, "docs/guide/intro.md", b"intro").await;
        put(&client, &bucket, "root.txt", b"root").await;

        let html = http_client()
            .get(format!("{}/{bucket}/docs/", gateway_url()))
            .send()
            .await
            .expect("listing")
            .text()
            .await
            .expect("body");
        assert!(html.contains("readme.txt"));
        assert!(html.contains(&format!("href=\"/{bucket}/docs/guide/\"")));
        assert!(!html.contains("root.txt"));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_remember_sort_choice() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "sort").await;
        put(&client, &bucket, "small.txt", b"s").await;
        put(&client, &bucket, "large.txt", b"llllllllllllllll").await;

        let resp = http_client()
            .get(format!("{}/{bucket}/?sort=size", gateway_url()))
            .send()
            .await
            .expect("listing");
        let cookie = resp.headers()[SET_COOKIE].to_str().expect("ascii").to_owned();
        assert!(cookie.starts_with("sort=size;"));

        let html = resp.text().await.expect("body");
        let large = html.find("large.txt").expect("large listed");
        let small = html.find("small.txt").expect("small listed");
        assert!(large < small);

        let html = http_client()
            .get(format!("{}/{bucket}/", gateway_url()))
            .header("Cookie", "sort=size")
            .send()
            .await
            .expect("listing")
            .text()
            .await
            .expect("body");
        assert!(html.contains("<option value=\"size\" selected>"));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_redirect_bare_bucket_path() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "slash").await;

        let resp = http_client()
            .get(format!("{}/{bucket}", gateway_url()))
            .send()
            .await
            .expect("bare bucket");
        assert_eq!(resp.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(resp.headers()[LOCATION], format!("/{bucket}/"));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_render_error_for_missing_bucket() {
        let resp = http_client()
            .get(format!("{}/no-such-bucket-s3dir/", gateway_url()))
            .send()
            .await
            .expect("missing bucket");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.text().await.expect("body").contains("NoSuchBucket"));
    }
}
