//! Object detail pages and signed-URL redirects.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use reqwest::header::LOCATION;

    use crate::{cleanup_bucket, create_test_bucket, gateway_url, http_client, put, s3_client};

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_render_object_details() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "detail").await;
        put(&client, &bucket, "notes/today.txt", b"0123456789").await;

        let html = http_client()
            .get(format!("{}/{bucket}/notes/today.txt", gateway_url()))
            .send()
            .await
            .expect("object page")
            .text()
            .await
            .expect("body");
        assert!(html.contains("<h1>today.txt</h1>"));
        assert!(html.contains("10 B"));
        assert!(html.contains("?location"));

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_redirect_to_signed_download() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "location").await;
        put(&client, &bucket, "file.bin", b"payload").await;

        let http = http_client();
        let resp = http
            .get(format!("{}/{bucket}/file.bin?location", gateway_url()))
            .send()
            .await
            .expect("location");
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

        let target = resp.headers()[LOCATION].to_str().expect("ascii").to_owned();
        assert!(target.contains("X-Amz-Signature="));
        assert!(target.contains("response-content-disposition="));

        let download = http.get(&target).send().await.expect("signed get");
        assert_eq!(download.status(), StatusCode::OK);
        assert_eq!(download.bytes().await.expect("bytes").as_ref(), b"payload");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_render_error_for_missing_object() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "missing").await;

        let resp = http_client()
            .get(format!("{}/{bucket}/absent.txt", gateway_url()))
            .send()
            .await
            .expect("object page");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.text().await.expect("body").contains("absent.txt"));

        cleanup_bucket(&client, &bucket).await;
    }
}
