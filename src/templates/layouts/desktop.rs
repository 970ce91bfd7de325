use crate::domain::models::User;
use crate::domain::status::Role;
use maud::{html, Markup, DOCTYPE};

pub fn desktop_layout(title: &str, user: Option<&User>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " · Change Tracker" }
                link rel="stylesheet" href="/static/main.css";
            }
            body {
                header class="flex items-center justify-between px-6 py-3 shadow" {
                    h3 { "Change Tracker" }
                    @if let Some(user) = user {
                        nav {
                            ul {
                                li { a href="/dashboard" { "Dashboard" } }
                                @if user.role == Role::ApplicationOwner {
                                    li { a href="/my-applications" { "My applications" } }
                                }
                            }
                        }
                        form method="post" action="/logout" class="inline" {
                            span { (user.name) " (" (user.role.label()) ") " }
                            button type="submit" { "Sign out" }
                        }
                    } @else {
                        a href="/login" class="text-base font-medium hover:text-blue-600" { "Sign in" }
                    }
                }
                (content)
            }
        }
    }
}
