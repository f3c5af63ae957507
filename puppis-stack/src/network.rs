//! Network topology: VPC, internet gateway, routing, per-zone subnets
//!
//! Declares one virtual network with an internet egress path and one
//! public subnet per configured availability zone, each associated with
//! the shared route table. Subnets reference the VPC and route table by
//! binding, so the graph orders them after both.

use std::collections::HashMap;

use puppis_core::resource::{Resource, Value};

use crate::config::{ConfigError, StackConfig};

/// Binding of the virtual network declaration
pub const VPC_BINDING: &str = "vpc";
/// Binding of the internet gateway declaration
pub const GATEWAY_BINDING: &str = "igw";
/// Binding of the shared route table declaration
pub const ROUTE_TABLE_BINDING: &str = "route_table";
/// Destination of the single catch-all route
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// The declared network topology
#[derive(Debug)]
pub struct NetworkTopology {
    pub resources: Vec<Resource>,
    /// Subnet bindings in zone order, for the cluster to reference
    pub subnet_bindings: Vec<String>,
}

/// Declare the network topology.
///
/// Fails when the zone and CIDR lists disagree in length; that mismatch
/// is a configuration error, not something to recover from.
pub fn declare(config: &StackConfig) -> Result<NetworkTopology, ConfigError> {
    let zones = &config.availability_zones;
    let cidrs = &config.public_subnet_cidrs;
    if zones.len() != cidrs.len() {
        return Err(ConfigError::ZoneCidrMismatch {
            zones: zones.len(),
            cidrs: cidrs.len(),
        });
    }

    let mut resources = Vec::new();

    let mut vpc_tags = HashMap::new();
    vpc_tags.insert("Name".to_string(), Value::String("gitops-vpc".to_string()));
    resources.push(
        Resource::new("ec2.vpc", VPC_BINDING)
            .with_attribute("cidr_block", Value::String(config.vpc_cidr.clone()))
            .with_attribute("enable_dns_hostnames", Value::Bool(true))
            .with_attribute("enable_dns_support", Value::Bool(true))
            .with_attribute("tags", Value::Map(vpc_tags)),
    );

    resources.push(Resource::new("ec2.internet_gateway", GATEWAY_BINDING));

    resources.push(
        Resource::new("ec2.vpc_gateway_attachment", "igw_attachment")
            .with_attribute("vpc_id", Value::reference(VPC_BINDING, "vpc_id"))
            .with_attribute(
                "internet_gateway_id",
                Value::reference(GATEWAY_BINDING, "internet_gateway_id"),
            ),
    );

    resources.push(
        Resource::new("ec2.route_table", ROUTE_TABLE_BINDING)
            .with_attribute("vpc_id", Value::reference(VPC_BINDING, "vpc_id")),
    );

    // The route table's only route: everything to the internet gateway
    resources.push(
        Resource::new("ec2.route", "default_route")
            .with_attribute(
                "route_table_id",
                Value::reference(ROUTE_TABLE_BINDING, "route_table_id"),
            )
            .with_attribute(
                "destination_cidr_block",
                Value::String(DEFAULT_ROUTE_CIDR.to_string()),
            )
            .with_attribute(
                "gateway_id",
                Value::reference(GATEWAY_BINDING, "internet_gateway_id"),
            ),
    );

    let mut subnet_bindings = Vec::with_capacity(zones.len());
    for (i, (zone, cidr)) in zones.iter().zip(cidrs.iter()).enumerate() {
        let binding = format!("subnet_{}", i);

        resources.push(
            Resource::new("ec2.subnet", format!("public-{}", zone))
                .with_binding(&binding)
                .with_attribute("vpc_id", Value::reference(VPC_BINDING, "vpc_id"))
                .with_attribute("cidr_block", Value::String(cidr.clone()))
                .with_attribute("availability_zone", Value::String(zone.clone()))
                .with_attribute("map_public_ip_on_launch", Value::Bool(true)),
        );

        resources.push(
            Resource::new(
                "ec2.subnet_route_table_association",
                format!("public-{}-rta", zone),
            )
            .with_binding(format!("{}_rta", binding))
            .with_attribute("subnet_id", Value::reference(&binding, "subnet_id"))
            .with_attribute(
                "route_table_id",
                Value::reference(ROUTE_TABLE_BINDING, "route_table_id"),
            ),
        );

        subnet_bindings.push(binding);
    }

    Ok(NetworkTopology {
        resources,
        subnet_bindings,
    })
}
