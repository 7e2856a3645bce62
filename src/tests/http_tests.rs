#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::mpsc;

    use crate::api::ApiClient;
    use crate::config::ApiConfig;
    use crate::metrics::Metrics;
    use crate::tests::mock_server::MockServer;
    use crate::transfer::http::{
        collect_upload_items, download_file_name, parse_content_disposition, unique_destination, DownloadSpec,
        HttpDownload, HttpUpload,
    };
    use crate::transfer::runner::{ItemState, SequentialRunner, TransferItem, TransferJob};
    use crate::types::{Direction, Outcome, TransferEvent};

    fn drain(rx: &mut mpsc::UnboundedReceiver<TransferEvent>) -> Vec<TransferEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn download_item(id: i64, dest: &TempDir, name: Option<&str>, is_folder: bool) -> TransferItem<DownloadSpec> {
        TransferItem::new(
            name.map(str::to_string).unwrap_or_else(|| format!("#{}", id)),
            None,
            DownloadSpec {
                file_id: id,
                dest_dir: dest.path().to_path_buf(),
                file_name: name.map(str::to_string),
                is_folder,
            },
        )
    }

    #[tokio::test]
    async fn test_upload_folder_batch() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let album = dir.path().join("album");
        fs::create_dir_all(album.join("sub")).unwrap();
        fs::write(album.join("a.txt"), b"first file").unwrap();
        fs::write(album.join("sub").join("b.txt"), vec![7u8; 4096]).unwrap();

        let items = collect_upload_items(&[album], Some(1)).unwrap();
        let mut job = TransferJob::new(Direction::Upload, items);
        assert_eq!(job.total_bytes(), 10 + 4096);

        let (tx, mut rx) = mpsc::unbounded_channel();
        // small chunks so the body is streamed in several pieces
        let runner = SequentialRunner::new(HttpUpload::new(server.client(), 512), tx, Metrics::new());
        let result = runner.run(&mut job).await;
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.completed_count, 2);

        let uploads = server.uploads();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].file_name, "a.txt");
        assert_eq!(uploads[0].bytes, b"first file");
        assert_eq!(uploads[0].relative_path.as_deref(), Some("album/a.txt"));
        assert_eq!(uploads[0].parent_id.as_deref(), Some("1"));
        assert_eq!(uploads[1].relative_path.as_deref(), Some("album/sub/b.txt"));
        assert_eq!(uploads[1].bytes.len(), 4096);

        for item in job.items() {
            assert_eq!(item.state(), ItemState::Completed);
            assert_eq!(Some(item.bytes_transferred()), item.size_bytes);
        }

        let events = drain(&mut rx);
        let progress: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                TransferEvent::Progress(s) => Some(s.cumulative_bytes),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(4106));
        match events.last() {
            Some(TransferEvent::Finished(f)) => assert_eq!(f.detail, "2 files uploaded."),
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_single_file_without_parent() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("photo.jpg");
        fs::write(&file, b"jpeg").unwrap();

        let items = collect_upload_items(&[file], None).unwrap();
        let mut job = TransferJob::new(Direction::Upload, items);
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpUpload::new(server.client(), 64 * 1024), tx, Metrics::new());
        assert!(runner.run(&mut job).await.is_success());

        let uploads = server.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].parent_id.is_none());
        assert!(uploads[0].relative_path.is_none());
        assert!(server.state.lock().unwrap().entries.iter().any(|e| e.filename == "photo.jpg"));
    }

    #[tokio::test]
    async fn test_rejected_upload_aborts_batch() {
        let server = MockServer::start().await;
        server.fail_uploads_from(1);
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["one.txt", "two.txt", "three.txt"]
            .iter()
            .map(|n| {
                let p = dir.path().join(n);
                fs::write(&p, n.as_bytes()).unwrap();
                p
            })
            .collect();

        let items = collect_upload_items(&paths, None).unwrap();
        let mut job = TransferJob::new(Direction::Upload, items);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpUpload::new(server.client(), 1024), tx, Metrics::new());
        let result = runner.run(&mut job).await;

        assert_eq!(result.outcome, Outcome::Failure);
        assert_eq!(result.completed_count, 1);
        assert_eq!(result.error.as_deref(), Some("Upload failed with status 500"));
        assert_eq!(server.uploads().len(), 1);
        assert_eq!(job.items()[2].state(), ItemState::Pending);

        match drain(&mut rx).last() {
            Some(TransferEvent::Finished(f)) => assert_eq!(f.outcome, Outcome::Failure),
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_failure() {
        // grab a free port and release it again
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let api = ApiClient::new(&ApiConfig {
            base_url: format!("http://127.0.0.1:{}", port),
            session_cookie: String::new(),
            connect_timeout_secs: 2,
        })
        .unwrap();
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.bin");
        fs::write(&file, b"data").unwrap();

        let mut job = TransferJob::new(Direction::Upload, collect_upload_items(&[file], None).unwrap());
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpUpload::new(api, 1024), tx, Metrics::new());
        let result = runner.run(&mut job).await;

        assert_eq!(result.outcome, Outcome::Failure);
        assert_eq!(result.completed_count, 0);
        assert!(result.error.unwrap().starts_with("network error"));
    }

    #[tokio::test]
    async fn test_download_batch_uses_response_names() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        let mut job = TransferJob::new(
            Direction::Download,
            vec![download_item(2, &dest, None, false), download_item(4, &dest, None, false)],
        );
        assert_eq!(job.total_bytes(), 0);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpDownload::new(server.client()), tx, Metrics::new());
        let result = runner.run(&mut job).await;
        assert!(result.is_success(), "{:?}", result.error);

        assert_eq!(fs::read(dest.path().join("notes.txt")).unwrap(), b"hello notes");
        assert_eq!(fs::read(dest.path().join("report.pdf")).unwrap().len(), 300_000);
        assert_eq!(job.items()[1].bytes_transferred(), 300_000);
        // sizes learned from Content-Length
        assert_eq!(job.items()[0].size_bytes, Some(11));
        assert_eq!(job.items()[1].size_bytes, Some(300_000));
        assert_eq!(job.total_bytes(), 300_011);

        let events = drain(&mut rx);
        assert!(matches!(events[0], TransferEvent::Started { indeterminate: true, .. }));
        let last = events
            .iter()
            .rev()
            .find_map(|e| match e {
                TransferEvent::Progress(s) => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(last.percent, 100.0);
        assert_eq!(last.cumulative_bytes, 300_011);
        assert!(!last.indeterminate);
    }

    #[tokio::test]
    async fn test_download_reports_byte_percent_and_eta() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        let mut job = TransferJob::new(Direction::Download, vec![download_item(4, &dest, None, false)]);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpDownload::new(server.client()), tx, Metrics::new());
        assert!(runner.run(&mut job).await.is_success());

        let samples: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                TransferEvent::Progress(s) => Some(s),
                _ => None,
            })
            .collect();
        assert!(samples.len() >= 2, "body arrived in {} chunk(s)", samples.len());
        assert!(samples.iter().all(|s| !s.indeterminate));
        assert!(samples.iter().any(|s| s.percent > 0.0 && s.percent < 100.0));
        assert!(samples.iter().any(|s| s.eta_seconds.is_some()));
        assert_eq!(samples.last().unwrap().percent, 100.0);
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_file() {
        // announces 1000 bytes, sends 10 and hangs up
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let head = "HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\
                        Content-Disposition: attachment; filename=\"big.iso\"\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&[1u8; 10]).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let api = ApiClient::new(&ApiConfig {
            base_url: format!("http://{}", addr),
            session_cookie: String::new(),
            connect_timeout_secs: 2,
        })
        .unwrap();
        let dest = TempDir::new().unwrap();
        let mut job = TransferJob::new(Direction::Download, vec![download_item(7, &dest, Some("big.iso"), false)]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpDownload::new(api), tx, Metrics::new());
        let result = runner.run(&mut job).await;

        assert_eq!(result.outcome, Outcome::Failure);
        assert!(result.error.unwrap().contains("download interrupted"));
        assert!(!dest.path().join("big.iso").exists());
        assert!(!dest.path().join("big.iso.part").exists());
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_same_name_downloads_do_not_overwrite() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        fs::write(dest.path().join("notes.txt"), b"mine").unwrap();

        let mut job = TransferJob::new(
            Direction::Download,
            vec![download_item(2, &dest, Some("notes.txt"), false), download_item(2, &dest, Some("notes.txt"), false)],
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpDownload::new(server.client()), tx, Metrics::new());
        assert!(runner.run(&mut job).await.is_success());

        assert_eq!(fs::read(dest.path().join("notes.txt")).unwrap(), b"mine");
        assert_eq!(fs::read(dest.path().join("notes (1).txt")).unwrap(), b"hello notes");
        assert_eq!(fs::read(dest.path().join("notes (2).txt")).unwrap(), b"hello notes");
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn test_unique_destination_suffixes() {
        let dir = TempDir::new().unwrap();
        assert_eq!(unique_destination(dir.path(), "a.txt").await.unwrap(), dir.path().join("a.txt"));

        fs::write(dir.path().join("a.txt"), b"x").unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();
        fs::write(dir.path().join("Docs.zip.part"), b"x").unwrap();
        assert_eq!(unique_destination(dir.path(), "a.txt").await.unwrap(), dir.path().join("a (1).txt"));
        assert_eq!(unique_destination(dir.path(), "README").await.unwrap(), dir.path().join("README (1)"));
        // a staged download still holds its name
        assert_eq!(unique_destination(dir.path(), "Docs.zip").await.unwrap(), dir.path().join("Docs (1).zip"));
    }

    #[tokio::test]
    async fn test_download_folder_is_saved_as_zip() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        let mut job = TransferJob::new(Direction::Download, vec![download_item(1, &dest, Some("Documents"), true)]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpDownload::new(server.client()), tx, Metrics::new());

        assert!(runner.run(&mut job).await.is_success());
        let saved = fs::read(dest.path().join("Documents.zip")).unwrap();
        assert!(saved.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_missing_download_fails_batch() {
        let server = MockServer::start().await;
        let dest = TempDir::new().unwrap();
        let mut job = TransferJob::new(
            Direction::Download,
            vec![download_item(2, &dest, Some("notes.txt"), false), download_item(404, &dest, None, false)],
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let runner = SequentialRunner::new(HttpDownload::new(server.client()), tx, Metrics::new());
        let result = runner.run(&mut job).await;

        assert_eq!(result.outcome, Outcome::Failure);
        assert_eq!(result.completed_count, 1);
        assert_eq!(result.error.as_deref(), Some("Download failed with status 404"));
        assert!(!dest.path().join("download-404").exists());
    }

    #[test]
    fn test_parse_content_disposition() {
        assert_eq!(parse_content_disposition("attachment; filename=\"a b.txt\""), Some("a b.txt".to_string()));
        assert_eq!(parse_content_disposition("attachment;filename=plain.bin"), Some("plain.bin".to_string()));
        assert_eq!(parse_content_disposition("inline"), None);
        assert_eq!(parse_content_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_download_file_name_fallbacks() {
        let spec = |name: Option<&str>, is_folder: bool| DownloadSpec {
            file_id: 9,
            dest_dir: PathBuf::from("."),
            file_name: name.map(str::to_string),
            is_folder,
        };

        assert_eq!(download_file_name(&spec(Some("listed.txt"), false), Some("header.txt")), "listed.txt");
        assert_eq!(download_file_name(&spec(None, false), Some("header.txt")), "header.txt");
        assert_eq!(download_file_name(&spec(None, false), None), "download-9");
        assert_eq!(download_file_name(&spec(None, false), Some("../../etc/passwd")), "passwd");
        assert_eq!(download_file_name(&spec(Some("Docs"), true), None), "Docs.zip");
        assert_eq!(download_file_name(&spec(None, true), Some("Docs.zip")), "Docs.zip");
        assert_eq!(download_file_name(&spec(None, true), None), "download-9.zip");
    }

    #[test]
    fn test_collect_upload_items_orders_and_sizes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("batch");
        fs::create_dir_all(root.join("z")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("b.txt"), b"bb").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("z").join("c.txt"), b"ccc").unwrap();
        let single = dir.path().join("single.md");
        fs::write(&single, b"# hi").unwrap();

        let items = collect_upload_items(&[root, single], Some(3)).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["batch/a.txt", "batch/b.txt", "batch/z/c.txt", "single.md"]);
        let sizes: Vec<Option<u64>> = items.iter().map(|i| i.size_bytes).collect();
        assert_eq!(sizes, vec![Some(1), Some(2), Some(3), Some(4)]);
        assert!(items.iter().all(|i| i.payload.parent_id == Some(3)));
        assert!(items[3].payload.relative_path.is_none());
    }

    #[test]
    fn test_collect_upload_items_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(collect_upload_items(&[dir.path().join("nope")], None).is_err());
    }
}
