//! Zip archive downloads.

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use reqwest::StatusCode;
    use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

    use crate::{cleanup_bucket, create_test_bucket, gateway_url, http_client, put, s3_client};

    fn entries(data: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).expect("valid zip");
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).expect("entry");
                let mut content = Vec::new();
                file.read_to_end(&mut content).expect("read entry");
                (file.name().to_owned(), content)
            })
            .collect()
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_download_prefix_as_zip() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "archive").await;
        put(&client, &bucket, "set/a.txt", b"alpha").await;
        put(&client, &bucket, "set/nested/b.txt", b"beta").await;
        put(&client, &bucket, "other.txt", b"outside").await;

        let resp = http_client()
            .get(format!("{}/{bucket}/set/?archive", gateway_url()))
            .send()
            .await
            .expect("archive");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/zip");
        let disposition = resp.headers()[CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii")
            .to_owned();
        assert!(disposition.contains(&format!("{bucket}_set.zip")));

        let data = resp.bytes().await.expect("body");
        assert_eq!(
            entries(&data),
            vec![
                ("a.txt".to_owned(), b"alpha".to_vec()),
                ("nested/b.txt".to_owned(), b"beta".to_vec()),
            ]
        );

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running gateway"]
    async fn test_should_download_empty_archive() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "empty").await;

        let data = http_client()
            .get(format!("{}/{bucket}/?archive", gateway_url()))
            .send()
            .await
            .expect("archive")
            .bytes()
            .await
            .expect("body");
        assert!(entries(&data).is_empty());

        cleanup_bucket(&client, &bucket).await;
    }
}
