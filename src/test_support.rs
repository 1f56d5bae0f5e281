use axum::Router;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
    .await
    .expect("bind stub server");
  let addr = listener.local_addr().expect("stub server addr");
  tokio::spawn(async move {
    axum::serve(listener, app).await.expect("stub server");
  });
  format!("http://{addr}")
}
