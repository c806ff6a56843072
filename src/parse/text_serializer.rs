use crate::model::session::Session;

/// Serialize every box as a titled list.
///
/// Each box becomes `"<title>:\n"`, one line per member in drop order, and
/// a blank line. The backlog is not written.
pub fn serialize_boxes(session: &Session) -> String {
    let mut out = String::new();
    for container in session.registry().iter() {
        out.push_str(&container.title);
        out.push_str(":\n");
        for id in container.members() {
            if let Some(item) = session.ledger().get(id) {
                out.push_str(&session.display_text(item));
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}
