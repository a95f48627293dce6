use std::collections::HashMap;

use anyhow::Result;
use axum::http::Method;

use crate::domain::value_objects::payloads::ResolvedPayload;

/// One named backend capability exposed through the gateway.
///
/// `route` is the public path registered under the API prefix and
/// `backend_path` is the automation backend path it maps to, with
/// `{marker}` placeholders filled from route params or payload fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: &'static str,
    pub method: Method,
    pub kind: OperationKind,
    pub route: &'static str,
    pub backend_path: &'static str,
    pub post_effect: Option<PostForwardEffect>,
}

/// Which processing path an operation takes.
///
/// `InstanceScoped` runs the full authorization, subscription, quota
/// and audit pipeline. `StatusRefresh` reads backend connectivity and
/// persists it without consuming quota. `AccountProvisioning` creates
/// a new instance under the caller's account. `AccountPassthrough`
/// forwards account-level reads that carry no instance at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationKind {
    InstanceScoped,
    StatusRefresh,
    AccountProvisioning,
    AccountPassthrough,
}

/// Local state transition applied after the backend confirmed the call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostForwardEffect {
    MarkDeleted,
    MarkLoggedOut,
}

const fn op(
    name: &'static str,
    method: Method,
    route: &'static str,
    backend_path: &'static str,
) -> Operation {
    Operation {
        name,
        method,
        kind: OperationKind::InstanceScoped,
        route,
        backend_path,
        post_effect: None,
    }
}

/// Every named operation the gateway serves. Routes are relative to
/// the API prefix; registration merges entries sharing a path into a
/// single method router.
pub static CATALOG: &[Operation] = &[
    Operation {
        name: "instance_create",
        method: Method::POST,
        kind: OperationKind::AccountProvisioning,
        route: "/instances",
        backend_path: "instance/create",
        post_effect: None,
    },
    Operation {
        name: "instance_list",
        method: Method::GET,
        kind: OperationKind::AccountPassthrough,
        route: "/instances",
        backend_path: "instance/list",
        post_effect: None,
    },
    Operation {
        name: "health_check",
        method: Method::GET,
        kind: OperationKind::AccountPassthrough,
        route: "/health",
        backend_path: "health",
        post_effect: None,
    },
    op(
        "instance_get",
        Method::GET,
        "/instances/:instance_id",
        "instance/{instance_id}",
    ),
    op(
        "instance_qr",
        Method::GET,
        "/instances/:instance_id/qr",
        "instance/{instance_id}/qr",
    ),
    Operation {
        name: "instance_status",
        method: Method::GET,
        kind: OperationKind::StatusRefresh,
        route: "/instances/:instance_id/status",
        backend_path: "instance/{instance_id}/status",
        post_effect: None,
    },
    Operation {
        name: "instance_delete",
        method: Method::DELETE,
        kind: OperationKind::InstanceScoped,
        route: "/instances/:instance_id",
        backend_path: "instance/{instance_id}",
        post_effect: Some(PostForwardEffect::MarkDeleted),
    },
    Operation {
        name: "instance_logout",
        method: Method::POST,
        kind: OperationKind::InstanceScoped,
        route: "/instances/:instance_id/logout",
        backend_path: "instance/{instance_id}/logout",
        post_effect: Some(PostForwardEffect::MarkLoggedOut),
    },
    op(
        "send_text",
        Method::POST,
        "/instances/:instance_id/send/text",
        "instance/{instance_id}/send/text",
    ),
    op(
        "send_media",
        Method::POST,
        "/instances/:instance_id/send/media",
        "instance/{instance_id}/send/media",
    ),
    op(
        "send_location",
        Method::POST,
        "/instances/:instance_id/send/location",
        "instance/{instance_id}/send/location",
    ),
    op(
        "send_reaction",
        Method::POST,
        "/instances/:instance_id/send/reaction",
        "instance/{instance_id}/send/reaction",
    ),
    op(
        "delete_message",
        Method::DELETE,
        "/instances/:instance_id/message",
        "instance/{instance_id}/message",
    ),
    op(
        "send_reply",
        Method::POST,
        "/instances/:instance_id/send/reply",
        "instance/{instance_id}/send/reply",
    ),
    op(
        "send_mention",
        Method::POST,
        "/instances/:instance_id/send/mention",
        "instance/{instance_id}/send/mention",
    ),
    op(
        "forward_message",
        Method::POST,
        "/instances/:instance_id/message/forward",
        "instance/{instance_id}/message/forward",
    ),
    op(
        "edit_message",
        Method::PUT,
        "/instances/:instance_id/message/edit",
        "instance/{instance_id}/message/edit",
    ),
    op(
        "pin_message",
        Method::POST,
        "/instances/:instance_id/message/pin",
        "instance/{instance_id}/message/pin",
    ),
    op(
        "unpin_message",
        Method::POST,
        "/instances/:instance_id/message/unpin",
        "instance/{instance_id}/message/unpin",
    ),
    op(
        "send_viewonce",
        Method::POST,
        "/instances/:instance_id/send/viewonce",
        "instance/{instance_id}/send/viewonce",
    ),
    op(
        "send_poll",
        Method::POST,
        "/instances/:instance_id/send/poll",
        "instance/{instance_id}/send/poll",
    ),
    op(
        "send_template_buttons",
        Method::POST,
        "/instances/:instance_id/send/template-buttons",
        "instance/{instance_id}/send/template-buttons",
    ),
    op(
        "download_media",
        Method::GET,
        "/instances/:instance_id/media/:message_id/download",
        "instance/{instance_id}/media/{message_id}/download",
    ),
    op(
        "generate_thumbnail",
        Method::POST,
        "/instances/:instance_id/media/thumbnail",
        "instance/{instance_id}/media/thumbnail",
    ),
    op(
        "optimize_image",
        Method::POST,
        "/instances/:instance_id/media/optimize",
        "instance/{instance_id}/media/optimize",
    ),
    op(
        "archive_chat",
        Method::POST,
        "/instances/:instance_id/chat/archive",
        "instance/{instance_id}/chat/archive",
    ),
    op(
        "mute_chat",
        Method::POST,
        "/instances/:instance_id/chat/mute",
        "instance/{instance_id}/chat/mute",
    ),
    op(
        "mark_read",
        Method::POST,
        "/instances/:instance_id/chat/read",
        "instance/{instance_id}/chat/read",
    ),
    op(
        "pin_chat",
        Method::POST,
        "/instances/:instance_id/chat/pin",
        "instance/{instance_id}/chat/pin",
    ),
    op(
        "delete_chat",
        Method::DELETE,
        "/instances/:instance_id/chat",
        "instance/{instance_id}/chat",
    ),
    op(
        "star_message",
        Method::POST,
        "/instances/:instance_id/chat/star",
        "instance/{instance_id}/chat/star",
    ),
    op(
        "set_disappearing",
        Method::POST,
        "/instances/:instance_id/chat/disappearing",
        "instance/{instance_id}/chat/disappearing",
    ),
    op(
        "chat_history",
        Method::GET,
        "/instances/:instance_id/chat/history",
        "instance/{instance_id}/chat/history",
    ),
    op(
        "update_presence",
        Method::POST,
        "/instances/:instance_id/presence/update",
        "instance/{instance_id}/presence/update",
    ),
    op(
        "set_typing",
        Method::POST,
        "/instances/:instance_id/presence/typing",
        "instance/{instance_id}/presence/typing",
    ),
    op(
        "set_online",
        Method::POST,
        "/instances/:instance_id/presence/online",
        "instance/{instance_id}/presence/online",
    ),
    op(
        "update_name",
        Method::PUT,
        "/instances/:instance_id/profile/name",
        "instance/{instance_id}/profile/name",
    ),
    op(
        "update_status",
        Method::PUT,
        "/instances/:instance_id/profile/status",
        "instance/{instance_id}/profile/status",
    ),
    op(
        "update_picture",
        Method::PUT,
        "/instances/:instance_id/profile/picture",
        "instance/{instance_id}/profile/picture",
    ),
    op(
        "get_picture",
        Method::GET,
        "/instances/:instance_id/profile/picture",
        "instance/{instance_id}/profile/picture",
    ),
    op(
        "block_user",
        Method::POST,
        "/instances/:instance_id/privacy/block",
        "instance/{instance_id}/privacy/block",
    ),
    op(
        "unblock_user",
        Method::POST,
        "/instances/:instance_id/privacy/unblock",
        "instance/{instance_id}/privacy/unblock",
    ),
    op(
        "get_blocklist",
        Method::GET,
        "/instances/:instance_id/privacy/blocklist",
        "instance/{instance_id}/privacy/blocklist",
    ),
    op(
        "update_privacy",
        Method::PUT,
        "/instances/:instance_id/privacy/settings",
        "instance/{instance_id}/privacy/settings",
    ),
    op(
        "get_privacy",
        Method::GET,
        "/instances/:instance_id/privacy/settings",
        "instance/{instance_id}/privacy/settings",
    ),
    op(
        "send_broadcast",
        Method::POST,
        "/instances/:instance_id/broadcast/send",
        "instance/{instance_id}/broadcast/send",
    ),
    op(
        "send_status",
        Method::POST,
        "/instances/:instance_id/status/send",
        "instance/{instance_id}/status/send",
    ),
    op(
        "create_group",
        Method::POST,
        "/instances/:instance_id/group/create",
        "instance/{instance_id}/group/create",
    ),
    op(
        "list_groups",
        Method::GET,
        "/instances/:instance_id/groups",
        "instance/{instance_id}/groups",
    ),
    op(
        "get_group",
        Method::GET,
        "/instances/:instance_id/group/:group_jid",
        "instance/{instance_id}/group/{group_jid}",
    ),
    op(
        "update_group_subject",
        Method::PUT,
        "/instances/:instance_id/group/:group_jid/subject",
        "instance/{instance_id}/group/{group_jid}/subject",
    ),
    op(
        "update_group_description",
        Method::PUT,
        "/instances/:instance_id/group/:group_jid/description",
        "instance/{instance_id}/group/{group_jid}/description",
    ),
    op(
        "group_participants",
        Method::PUT,
        "/instances/:instance_id/group/:group_jid/participants",
        "instance/{instance_id}/group/{group_jid}/participants",
    ),
    op(
        "leave_group",
        Method::POST,
        "/instances/:instance_id/group/:group_jid/leave",
        "instance/{instance_id}/group/{group_jid}/leave",
    ),
    op(
        "get_invite_code",
        Method::GET,
        "/instances/:instance_id/group/:group_jid/invite",
        "instance/{instance_id}/group/{group_jid}/invite",
    ),
    op(
        "check_number",
        Method::GET,
        "/instances/:instance_id/utils/check-number",
        "instance/{instance_id}/utils/check-number",
    ),
    op(
        "validate_jid",
        Method::GET,
        "/instances/:instance_id/utils/validate-jid",
        "instance/{instance_id}/utils/validate-jid",
    ),
    op(
        "format_number",
        Method::GET,
        "/instances/:instance_id/utils/format-number",
        "instance/{instance_id}/utils/format-number",
    ),
    op(
        "device_info",
        Method::GET,
        "/instances/:instance_id/utils/device-info",
        "instance/{instance_id}/utils/device-info",
    ),
    op(
        "send_link_preview",
        Method::POST,
        "/instances/:instance_id/advanced/link-preview",
        "instance/{instance_id}/advanced/link-preview",
    ),
    op(
        "send_sticker",
        Method::POST,
        "/instances/:instance_id/advanced/sticker",
        "instance/{instance_id}/advanced/sticker",
    ),
    op(
        "search_messages",
        Method::GET,
        "/instances/:instance_id/advanced/search",
        "instance/{instance_id}/advanced/search",
    ),
    op(
        "export_chat",
        Method::POST,
        "/instances/:instance_id/advanced/export",
        "instance/{instance_id}/advanced/export",
    ),
    op(
        "get_messages",
        Method::GET,
        "/instances/:instance_id/messages",
        "instance/{instance_id}/messages",
    ),
];

/// Escape hatch for backend endpoints the catalog does not name.
/// Instance id and endpoint arrive as payload control values instead
/// of route params.
pub static PROXY: Operation = Operation {
    name: "proxy",
    method: Method::POST,
    kind: OperationKind::InstanceScoped,
    route: "/proxy",
    backend_path: "instance/{instance_id}/{endpoint}",
    post_effect: None,
};

impl Operation {
    /// Fills `{marker}` placeholders from route params first, then
    /// from payload fields. A marker nobody supplied is a caller bug
    /// the router should have caught, so it surfaces as an error.
    pub fn render_backend_path(
        &self,
        params: &HashMap<String, String>,
        payload: &ResolvedPayload,
    ) -> Result<String> {
        let mut rendered = String::with_capacity(self.backend_path.len());
        let mut rest = self.backend_path;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                anyhow::anyhow!("Unclosed marker in backend path: {}", self.backend_path)
            })?;
            let marker = &after[..close];

            let value = params
                .get(marker)
                .map(String::as_str)
                .or_else(|| payload.get_str(marker))
                .ok_or_else(|| {
                    anyhow::anyhow!("Missing value for backend path marker: {}", marker)
                })?;

            rendered.push_str(value);
            rest = &after[close + 1..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

pub fn proxy_backend_path(instance_id: &str, endpoint: &str) -> String {
    format!(
        "instance/{}/{}",
        instance_id,
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[test]
    fn catalog_routes_do_not_collide() {
        let mut seen = HashSet::new();

        for operation in CATALOG {
            assert!(
                seen.insert((operation.route, operation.method.as_str())),
                "duplicate registration for {} {}",
                operation.method,
                operation.route,
            );
        }
    }

    #[test]
    fn catalog_names_are_unique() {
        let mut seen = HashSet::new();

        for operation in CATALOG {
            assert!(seen.insert(operation.name), "duplicate name {}", operation.name);
        }
    }

    #[test]
    fn instance_scoped_routes_carry_the_instance_marker() {
        for operation in CATALOG {
            let scoped = matches!(
                operation.kind,
                OperationKind::InstanceScoped | OperationKind::StatusRefresh
            );
            if !scoped {
                continue;
            }

            assert!(
                operation.route.starts_with("/instances/:instance_id"),
                "{} route misses the instance param",
                operation.name,
            );
            assert!(
                operation.backend_path.contains("{instance_id}"),
                "{} backend path misses the instance marker",
                operation.name,
            );
        }
    }

    #[test]
    fn catalog_backend_markers_all_have_route_params() {
        for operation in CATALOG {
            let mut rest = operation.backend_path;
            while let Some(open) = rest.find('{') {
                let after = &rest[open + 1..];
                let close = after.find('}').unwrap();
                let marker = &after[..close];

                assert!(
                    operation.route.contains(&format!(":{}", marker)),
                    "{} marker {} has no route param",
                    operation.name,
                    marker,
                );
                rest = &after[close + 1..];
            }
        }
    }

    #[test]
    fn render_prefers_route_params_over_payload() {
        let operation = op(
            "download_media",
            Method::GET,
            "/instances/:instance_id/media/:message_id/download",
            "instance/{instance_id}/media/{message_id}/download",
        );
        let mut params = HashMap::new();
        params.insert("instance_id".to_string(), "wa-main".to_string());
        params.insert("message_id".to_string(), "ABC123".to_string());
        let mut payload = ResolvedPayload::default();
        payload.fields.insert(
            "message_id".to_string(),
            serde_json::Value::String("ignored".to_string()),
        );

        let rendered = operation.render_backend_path(&params, &payload).unwrap();

        assert_eq!(rendered, "instance/wa-main/media/ABC123/download");
    }

    #[test]
    fn render_falls_back_to_payload_fields() {
        let operation = op(
            "get_group",
            Method::GET,
            "/instances/:instance_id/group/:group_jid",
            "instance/{instance_id}/group/{group_jid}",
        );
        let mut params = HashMap::new();
        params.insert("instance_id".to_string(), "wa-main".to_string());
        let mut payload = ResolvedPayload::default();
        payload.fields.insert(
            "group_jid".to_string(),
            serde_json::Value::String("1203@g.us".to_string()),
        );

        let rendered = operation.render_backend_path(&params, &payload).unwrap();

        assert_eq!(rendered, "instance/wa-main/group/1203@g.us");
    }

    #[test]
    fn render_fails_when_a_marker_has_no_value() {
        let operation = op(
            "instance_qr",
            Method::GET,
            "/instances/:instance_id/qr",
            "instance/{instance_id}/qr",
        );

        let result = operation.render_backend_path(&HashMap::new(), &ResolvedPayload::default());

        assert!(result.is_err());
    }

    #[test]
    fn proxy_paths_never_double_the_slash() {
        assert_eq!(
            proxy_backend_path("wa-main", "send/text"),
            "instance/wa-main/send/text"
        );
        assert_eq!(
            proxy_backend_path("wa-main", "/send/text"),
            "instance/wa-main/send/text"
        );
    }
}
