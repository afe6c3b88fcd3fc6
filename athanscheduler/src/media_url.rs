/// URL the speakers fetch `relative_path` from, each path segment
/// percent-encoded (all but `A-Za-z0-9-_.~`): `http://10.0.0.2:8080/fajr/Adhan%20Makkah.mp3`
pub fn audio_url(host: &str, port: u16, relative_path: &str) -> String {
    let path = relative_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("http://{}:{}/{}", host, port, path)
}
