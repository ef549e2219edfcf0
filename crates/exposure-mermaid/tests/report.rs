use pretty_assertions::assert_eq;

use exposure_core::{
    AutoScalingGroup, Components, Instance, LoadBalancer, Rule, SecurityGroup, SnapshotRequest,
    assemble, provider::InventoryDocument,
};
use exposure_mermaid::{NO_EXPOSURES, generate_report, render_load_balancer_view, split_sections};

fn web_tier() -> Components {
    Components {
        security_groups: vec![
            SecurityGroup::new(
                "sg-1",
                "web-sg",
                vec![
                    Rule::ingress("tcp", 80, 80, "0.0.0.0/0"),
                    Rule::ingress("tcp", 443, 443, "0.0.0.0/0"),
                ],
            ),
            SecurityGroup::new(
                "sg-2",
                "admin-sg",
                vec![
                    Rule::ingress("tcp", 22, 22, "203.0.113.5/32"),
                    Rule::egress("-1", 0, 0, "198.51.100.7/32"),
                ],
            ),
        ],
        instances: vec![
            Instance::new("i-1", "t3.micro", vec!["sg-1".into()]),
            Instance::new("i-2", "t3.micro", vec!["sg-1".into()]),
            Instance::new("i-3", "t3.small", vec!["sg-1".into(), "sg-2".into()]),
        ],
        auto_scaling_groups: vec![AutoScalingGroup::new(
            "web-asg",
            vec!["i-1".into(), "i-2".into()],
            vec!["sg-1".into()],
        )],
        ..Default::default()
    }
}

const WEB_TIER_REPORT: &str = r#"=== Attack Surface: 0.0.0.0/0 ===

graph TD
  CIDR_0_0_0_0_0["0.0.0.0/0"]
  sg_1["web-sg"]
  web_asg["ASG: web-asg"]
  i-3["i-3 (t3.small)"]
  CIDR_0_0_0_0_0 -->|"Port 80-80 (tcp)"| sg_1
  CIDR_0_0_0_0_0 -->|"Port 443-443 (tcp)"| sg_1
  sg_1 --> web_asg
  sg_1 --> i-3

  classDef cidr fill:#ff6666
  classDef sg fill:#99ccff
  classDef asg fill:#ffb3ff
  classDef ec2 fill:#ff9999
  class CIDR_0_0_0_0_0 cidr
  class sg_1 sg
  class web_asg asg
  class i-3 ec2

=== Attack Surface: 198.51.100.7/32 ===

graph TD
  NoExposure["No exposure from 198.51.100.7/32"]

=== Attack Surface: 203.0.113.5/32 ===

graph TD
  CIDR_203_0_113_5_32["203.0.113.5/32"]
  sg_2["admin-sg"]
  i-3["i-3 (t3.small)"]
  CIDR_203_0_113_5_32 -->|"Port 22-22 (tcp)"| sg_2
  sg_2 --> i-3

  classDef cidr fill:#ff6666
  classDef sg fill:#99ccff
  classDef ec2 fill:#ff9999
  class CIDR_203_0_113_5_32 cidr
  class sg_2 sg
  class i-3 ec2

"#;

#[test]
fn test_single_web_server() {
    let components = Components {
        security_groups: vec![SecurityGroup::new(
            "sg-1",
            "web-sg",
            vec![Rule::ingress("tcp", 80, 80, "0.0.0.0/0")],
        )],
        instances: vec![Instance::new("i-1", "t2.micro", vec!["sg-1".into()])],
        ..Default::default()
    };

    let expected = r#"=== Attack Surface: 0.0.0.0/0 ===

graph TD
  CIDR_0_0_0_0_0["0.0.0.0/0"]
  sg_1["web-sg"]
  i-1["i-1 (t2.micro)"]
  CIDR_0_0_0_0_0 -->|"Port 80-80 (tcp)"| sg_1
  sg_1 --> i-1

  classDef cidr fill:#ff6666
  classDef sg fill:#99ccff
  classDef ec2 fill:#ff9999
  class CIDR_0_0_0_0_0 cidr
  class sg_1 sg
  class i-1 ec2

"#;
    assert_eq!(generate_report(&components), expected);
}

#[test]
fn test_multi_range_report() {
    assert_eq!(generate_report(&web_tier()), WEB_TIER_REPORT);
}

#[test]
fn test_report_is_deterministic() {
    let components = web_tier();
    let first = generate_report(&components);
    for _ in 0..8 {
        assert_eq!(generate_report(&components), first);
    }
}

#[test]
fn test_empty_snapshot() {
    assert_eq!(generate_report(&Components::default()), NO_EXPOSURES);
}

#[test]
fn test_load_balancer_outside_vpc_leaves_nothing_to_report() {
    let document = InventoryDocument {
        load_balancers: vec![exposure_core::provider::InventoryLoadBalancer {
            arn: "arn:aws:elasticloadbalancing:loadbalancer/app/web/1".into(),
            name: "web".into(),
            kind: "application".into(),
            vpc_id: Some("vpc-other".into()),
            target_groups: Vec::new(),
        }],
        ..Default::default()
    };
    let request =
        SnapshotRequest::new("default", "us-east-1").with_vpc_id(Some("vpc-1".into()));
    let components = assemble(document, &request);

    assert!(components.load_balancers.is_empty());
    assert_eq!(generate_report(&components), NO_EXPOSURES);
}

#[test]
fn test_substring_range_renders_no_exposure() {
    // Only an egress rule names the range, so it is detected but nothing admits it.
    let report = generate_report(&web_tier());
    let sections = split_sections(&report);
    let section = sections
        .iter()
        .find(|s| s.range() == Some("198.51.100.7/32"))
        .expect("section for egress-only range");
    assert_eq!(
        section.body,
        "graph TD\n  NoExposure[\"No exposure from 198.51.100.7/32\"]"
    );
}

#[test]
fn test_sections_round_trip() {
    let sections = split_sections(&generate_report(&web_tier()));
    let titles: Vec<_> = sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Attack Surface: 0.0.0.0/0",
            "Attack Surface: 198.51.100.7/32",
            "Attack Surface: 203.0.113.5/32",
        ]
    );
    assert!(sections.iter().all(|s| s.body.starts_with("graph TD")));
}

#[test]
fn test_asg_members_never_render_standalone() {
    let report = generate_report(&web_tier());
    assert!(!report.contains("i-1["));
    assert!(!report.contains("i-2["));
    assert!(!report.contains("--> i-1"));
}

fn web_lb() -> LoadBalancer {
    LoadBalancer {
        id: "arn:aws:elasticloadbalancing:us-east-1:1:loadbalancer/app/web-lb/f00d".into(),
        name: "web-lb".into(),
        kind: "application".into(),
        target_groups: vec!["tg-web".into()],
    }
}

fn fronted_web_tier() -> Components {
    Components {
        security_groups: vec![SecurityGroup::new(
            "sg-web",
            "web-sg",
            vec![
                Rule::ingress("tcp", 443, 443, "0.0.0.0/0"),
                Rule::ingress("tcp", 22, 22, "10.0.0.0/8"),
                Rule::ingress("tcp", 22, 22, "10.1.2.0/24"),
            ],
        )],
        instances: vec![Instance::new("i-1", "t3.micro", vec!["sg-web".into()])],
        auto_scaling_groups: vec![AutoScalingGroup::new(
            "web-asg",
            vec!["i-1".into()],
            vec!["sg-web".into()],
        )],
        load_balancers: vec![web_lb()],
        ..Default::default()
    }
}

#[test]
fn test_load_balancer_view() {
    let expected = r#"graph TD
  subgraph External["External Networks"]
    CIDR_0_0_0_0_0["0.0.0.0/0"]
  end
  CIDR_10_1_2_0_24["10.1.2.0/24"]
  f00d["web-lb (application)"]
  sg_web["web-sg"]
  web_asg["ASG: web-asg"]
  CIDR_0_0_0_0_0 -->|"HTTP/HTTPS"| f00d
  CIDR_0_0_0_0_0 -->|"INGRESS Port 443-443 (tcp)"| sg_web
  CIDR_10_1_2_0_24 -->|"INGRESS Port 22-22 (tcp)"| sg_web
  sg_web --> web_asg

  classDef sg fill:#99ccff
  classDef lb fill:#99ff99
  classDef cidr fill:#ffcc99
  classDef asg fill:#ffb3ff
  class CIDR_0_0_0_0_0 cidr
  class CIDR_10_1_2_0_24 cidr
  class f00d lb
  class sg_web sg
  class web_asg asg
"#;
    assert_eq!(
        render_load_balancer_view(&fronted_web_tier(), Some(&web_lb())),
        expected
    );
}

#[test]
fn test_broad_subnet_only_leaves_the_focused_view() {
    let components = fronted_web_tier();
    let view = render_load_balancer_view(&components, Some(&web_lb()));
    assert!(!view.contains("CIDR_10_0_0_0_8"));

    let per_range = exposure_mermaid::render(&exposure_core::build_subgraph(
        &components,
        "10.0.0.0/8",
    ));
    assert!(per_range.contains("CIDR_10_0_0_0_8 -->|\"Port 22-22 (tcp)\"| sg_web"));
}
