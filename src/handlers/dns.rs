//! DNS-serving option extensions: RFC 3646 Recursive Name Servers (option
//! 23) and Domain Search List (option 24), contributed as extension setup
//! handlers and merged through the Option Combiner (SPEC_FULL.md §4.4,
//! §4.6, §9).
//!
//! dhcpkit's `DomainSearchListOptionHandler.combine()` famously read the
//! wrong field (the DNS-servers list instead of the search list) when
//! merging a second contributor's domains in. This implementation's
//! `DhcpOption::DomainSearchList` and `DhcpOption::RecursiveNameServers`
//! variants carry unrelated payload types (`Vec<String>` vs `Vec<Ipv6Addr>`),
//! so that particular mistake does not type-check here; the regression test
//! below pins the intended behavior anyway.

use std::net::Ipv6Addr;
use std::sync::Arc;

use crate::pipeline::{
    bundle::TransactionBundle, dedup_concat, CombiningHandler, Extension, Node, OptionContributor,
};
use crate::wire::option::code;
use crate::wire::DhcpOption;

pub struct RecursiveNameServersOptionHandler {
    pub servers: Vec<Ipv6Addr>,
}

impl OptionContributor for RecursiveNameServersOptionHandler {
    fn option_code(&self) -> u16 {
        code::DNS_SERVERS
    }

    fn contribution(&self, bundle: &TransactionBundle) -> Option<DhcpOption> {
        if self.servers.is_empty() || !option_requested(bundle, code::DNS_SERVERS) {
            return None;
        }
        Some(DhcpOption::RecursiveNameServers(self.servers.clone()))
    }

    fn combine(&self, existing: Option<&DhcpOption>, own: DhcpOption) -> DhcpOption {
        let own_servers = match &own {
            DhcpOption::RecursiveNameServers(s) => s.clone(),
            _ => return own,
        };
        let existing_servers = match existing {
            Some(DhcpOption::RecursiveNameServers(s)) => s.as_slice(),
            _ => &[],
        };
        DhcpOption::RecursiveNameServers(dedup_concat(existing_servers, &own_servers))
    }
}

pub struct DomainSearchListOptionHandler {
    pub search_list: Vec<String>,
}

impl OptionContributor for DomainSearchListOptionHandler {
    fn option_code(&self) -> u16 {
        code::DOMAIN_LIST
    }

    fn contribution(&self, bundle: &TransactionBundle) -> Option<DhcpOption> {
        if self.search_list.is_empty() || !option_requested(bundle, code::DOMAIN_LIST) {
            return None;
        }
        Some(DhcpOption::DomainSearchList(self.search_list.clone()))
    }

    fn combine(&self, existing: Option<&DhcpOption>, own: DhcpOption) -> DhcpOption {
        let own_names = match &own {
            DhcpOption::DomainSearchList(names) => names.clone(),
            _ => return own,
        };
        // Reads the *search list*, never the DNS-servers list — see module docs.
        let existing_names = match existing {
            Some(DhcpOption::DomainSearchList(names)) => names.as_slice(),
            _ => &[],
        };
        DhcpOption::DomainSearchList(dedup_concat(existing_names, &own_names))
    }
}

fn option_requested(bundle: &TransactionBundle, wanted: u16) -> bool {
    match bundle.request.get_option(code::ORO) {
        Some(DhcpOption::OptionRequest(codes)) => codes.contains(&wanted),
        _ => false,
    }
}

/// Bundles both DNS option contributors into one installable [`Extension`].
pub struct DnsExtension {
    pub recursive_name_servers: Vec<Ipv6Addr>,
    pub domain_search_list: Vec<String>,
}

impl Extension for DnsExtension {
    fn create_setup_handlers(&self) -> Vec<Node> {
        vec![
            Node::handler(CombiningHandler(RecursiveNameServersOptionHandler {
                servers: self.recursive_name_servers.clone(),
            })),
            Node::handler(CombiningHandler(DomainSearchListOptionHandler {
                search_list: self.domain_search_list.clone(),
            })),
        ]
    }

    fn create_cleanup_handlers(&self) -> Vec<Node> {
        Vec::new()
    }
}

impl DnsExtension {
    pub fn into_extension(self) -> Arc<dyn Extension> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::filter::run_list;
    use crate::wire::{Message, MessageType};
    use std::collections::HashSet;

    fn bundle_requesting(codes: Vec<u16>) -> TransactionBundle {
        let mut request = Message::new(MessageType::InformationRequest, [0, 0, 1]);
        request.options.push(DhcpOption::OptionRequest(codes));
        let mut bundle = TransactionBundle::new(
            request,
            Vec::new(),
            HashSet::new(),
            true,
            false,
            false,
        );
        bundle.response = Some(crate::pipeline::ResponseMessage::Reply(Message::new(
            MessageType::Reply,
            [0, 0, 1],
        )));
        bundle
    }

    #[test]
    fn recursive_name_servers_combine_from_two_contributors_without_duplicates() {
        let mut bundle = bundle_requesting(vec![code::DNS_SERVERS]);
        let first = CombiningHandler(RecursiveNameServersOptionHandler {
            servers: vec!["2001:db8::53".parse().unwrap()],
        });
        let second = CombiningHandler(RecursiveNameServersOptionHandler {
            servers: vec![
                "2001:db8::53".parse().unwrap(),
                "2001:db8::54".parse().unwrap(),
            ],
        });
        run_list(
            &[Node::handler(first), Node::handler(second)],
            &mut bundle,
        )
        .unwrap();

        let response = bundle.response_message().unwrap();
        match response.get_option(code::DNS_SERVERS).unwrap() {
            DhcpOption::RecursiveNameServers(servers) => {
                assert_eq!(
                    servers,
                    &vec![
                        "2001:db8::53".parse::<Ipv6Addr>().unwrap(),
                        "2001:db8::54".parse::<Ipv6Addr>().unwrap(),
                    ]
                );
            }
            _ => panic!(),
        }
    }

    #[test]
    fn domain_search_list_combine_reads_the_search_list_not_the_dns_servers() {
        let mut bundle = bundle_requesting(vec![code::DOMAIN_LIST]);
        let first = CombiningHandler(DomainSearchListOptionHandler {
            search_list: vec!["example.com".to_string()],
        });
        let second = CombiningHandler(DomainSearchListOptionHandler {
            search_list: vec!["example.com".to_string(), "corp.example.com".to_string()],
        });
        run_list(
            &[Node::handler(first), Node::handler(second)],
            &mut bundle,
        )
        .unwrap();

        let response = bundle.response_message().unwrap();
        match response.get_option(code::DOMAIN_LIST).unwrap() {
            DhcpOption::DomainSearchList(names) => {
                assert_eq!(
                    names,
                    &vec!["example.com".to_string(), "corp.example.com".to_string()]
                );
            }
            _ => panic!(),
        }
    }

    #[test]
    fn contributes_nothing_when_not_requested() {
        let mut bundle = bundle_requesting(vec![]);
        let handler = CombiningHandler(RecursiveNameServersOptionHandler {
            servers: vec!["2001:db8::53".parse().unwrap()],
        });
        run_list(&[Node::handler(handler)], &mut bundle).unwrap();
        let response = bundle.response_message().unwrap();
        assert!(response.get_option(code::DNS_SERVERS).is_none());
    }
}
