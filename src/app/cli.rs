//! Command line surface and report dispatch.
//!
//! Every subcommand resolves to one describer call, then the rows are sorted
//! by the report's declared order and rendered.

use crate::app::config::DescribeConfig;
use crate::app::describer::aws_services::ec2::{Ec2Describer, Ec2Query, Ec2SdkClient};
use crate::app::describer::aws_services::elb::LoadBalancerSdkClient;
use crate::app::describer::aws_services::iam::model::PolicyScope;
use crate::app::describer::aws_services::iam::{IamDescriber, IamSdkClient, PrincipalQuery};
use crate::app::describer::aws_services::s3::{BucketQuery, S3Describer, S3SdkClient};
use crate::app::describer::documents::DocumentOptions;
use crate::app::describer::filter;
use crate::app::describer::orchestrator::Orchestrator;
use crate::app::describer::report::{sort_rows, ReportRow};
use crate::app::render::{render, OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use aws_types::SdkConfig;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Column hidden unless documents were requested.
pub const DOCUMENT_COLUMN: &str = "PolicyDocument";

#[derive(Debug, Parser)]
#[command(
    name = "awsdescribe",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ")"),
    about = "Describe and correlate AWS resources as flat tables"
)]
pub struct Cli {
    /// AWS shared config profile
    #[arg(long, short = 'p', global = true)]
    pub profile: Option<String>,

    /// Region of the SDK client, used for global services
    #[arg(long, short = 'r', global = true, env = "AWS_DEFAULT_REGION")]
    pub region: Option<String>,

    #[arg(long, short = 'o', global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Omit the header row
    #[arg(long, global = true)]
    pub no_header: bool,

    /// Columns to merge by repeated value
    #[arg(long, short = 'M', global = true, value_delimiter = ',')]
    pub merge: Vec<String>,

    /// Columns to leave out
    #[arg(long, short = 'I', global = true, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Config file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also log to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub service: Service,
}

#[derive(Debug, Subcommand)]
pub enum Service {
    /// EC2 and VPC resources, per region
    Ec2 {
        #[command(subcommand)]
        command: Ec2Command,
    },
    /// IAM principals and policies
    Iam {
        #[command(subcommand)]
        command: IamCommand,
    },
    /// S3 buckets
    S3 {
        #[command(subcommand)]
        command: S3Command,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InstanceJoin {
    Default,
    Sg,
    Route,
    Storage,
    Backup,
    Lb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageJoin {
    Default,
    Backup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecurityGroupJoin {
    Default,
    Perms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VpcJoin {
    Default,
    Attr,
    Cidr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SubnetJoin {
    Default,
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RouteTableJoin {
    Default,
    Assoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UserJoin {
    Default,
    Policy,
    Group,
    Assoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupJoin {
    Default,
    Policy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleJoin {
    Default,
    Policy,
    Assume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyScopeArg {
    Local,
    Aws,
}

impl From<PolicyScopeArg> for PolicyScope {
    fn from(scope: PolicyScopeArg) -> Self {
        match scope {
            PolicyScopeArg::Local => PolicyScope::Local,
            PolicyScopeArg::Aws => PolicyScope::Aws,
        }
    }
}

#[derive(Debug, Args)]
pub struct Ec2Args {
    /// Target regions; defaults to the configured set
    #[arg(long, short = 'R', value_delimiter = ',')]
    pub regions: Vec<String>,

    #[arg(long, short = 'i', value_delimiter = ',')]
    pub ids: Vec<String>,

    /// Names or Name tags
    #[arg(long, short = 'n', value_delimiter = ',')]
    pub names: Vec<String>,

    /// Filter expression, e.g. "{Name: 'tag:Env', Values: ['prod']}"
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Apply the report's default predicate
    #[arg(long, short = 'D', default_value_t = true, action = ArgAction::Set)]
    pub default_filter: bool,
}

impl Ec2Args {
    pub fn query(&self) -> Result<Ec2Query> {
        let filters = match &self.filter {
            Some(expression) => filter::compile(expression)?,
            None => Vec::new(),
        };
        Ok(Ec2Query {
            ids: self.ids.clone(),
            names: self.names.clone(),
            filters,
            default_filter: self.default_filter,
        })
    }
}

#[derive(Debug, Args)]
pub struct IamArgs {
    #[arg(long, short = 'i', value_delimiter = ',')]
    pub ids: Vec<String>,

    #[arg(long, short = 'n', value_delimiter = ',')]
    pub names: Vec<String>,

    /// Fetch policy documents
    #[arg(long, short = 'd')]
    pub document: bool,

    /// Keep only documents containing any of these strings
    #[arg(long, short = 'F', value_delimiter = ',')]
    pub document_filter: Vec<String>,
}

impl IamArgs {
    pub fn query(&self) -> PrincipalQuery {
        PrincipalQuery {
            ids: self.ids.clone(),
            names: self.names.clone(),
        }
    }

    pub fn documents(&self) -> Result<DocumentOptions> {
        Ok(DocumentOptions::new(self.document, self.document_filter.clone())?)
    }
}

#[derive(Debug, Subcommand)]
pub enum Ec2Command {
    GetInstances {
        #[command(flatten)]
        args: Ec2Args,
        #[arg(long, short = 'j', value_enum, default_value_t = InstanceJoin::Default)]
        join: InstanceJoin,
    },
    GetImages {
        #[command(flatten)]
        args: Ec2Args,
        #[arg(long, short = 'j', value_enum, default_value_t = ImageJoin::Default)]
        join: ImageJoin,
    },
    GetSecurityGroups {
        #[command(flatten)]
        args: Ec2Args,
        #[arg(long, short = 'j', value_enum, default_value_t = SecurityGroupJoin::Default)]
        join: SecurityGroupJoin,
    },
    GetVpcs {
        #[command(flatten)]
        args: Ec2Args,
        #[arg(long, short = 'j', value_enum, default_value_t = VpcJoin::Default)]
        join: VpcJoin,
    },
    GetSubnets {
        #[command(flatten)]
        args: Ec2Args,
        #[arg(long, short = 'j', value_enum, default_value_t = SubnetJoin::Default)]
        join: SubnetJoin,
    },
    GetRouteTables {
        #[command(flatten)]
        args: Ec2Args,
        #[arg(long, short = 'j', value_enum, default_value_t = RouteTableJoin::Default)]
        join: RouteTableJoin,
    },
}

#[derive(Debug, Subcommand)]
pub enum IamCommand {
    GetUsers {
        #[command(flatten)]
        args: IamArgs,
        #[arg(long, short = 'j', value_enum, default_value_t = UserJoin::Default)]
        join: UserJoin,
    },
    GetGroups {
        #[command(flatten)]
        args: IamArgs,
        #[arg(long, short = 'j', value_enum, default_value_t = GroupJoin::Default)]
        join: GroupJoin,
    },
    GetRoles {
        #[command(flatten)]
        args: IamArgs,
        #[arg(long, short = 'j', value_enum, default_value_t = RoleJoin::Default)]
        join: RoleJoin,
    },
    GetPolicies {
        #[command(flatten)]
        args: IamArgs,
        #[arg(long, short = 's', value_enum, default_value_t = PolicyScopeArg::Local)]
        scope: PolicyScopeArg,
    },
}

#[derive(Debug, Subcommand)]
pub enum S3Command {
    GetBuckets {
        /// Regions an accessible bucket must live in; defaults to the configured set
        #[arg(long, short = 'R', value_delimiter = ',')]
        regions: Vec<String>,
        #[arg(long, short = 'n', value_delimiter = ',')]
        names: Vec<String>,
        #[arg(long, short = 'd')]
        document: bool,
        #[arg(long, short = 'F', value_delimiter = ',')]
        document_filter: Vec<String>,
    },
}

/// Per-report presentation defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    /// Leading columns merged when the user gave no `--merge`.
    pub merge_leading: usize,
    pub documents: bool,
}

impl Layout {
    pub fn merged(merge_leading: usize) -> Self {
        Self {
            merge_leading,
            documents: false,
        }
    }

    pub fn with_documents(mut self, documents: bool) -> Self {
        self.documents = documents;
        self
    }

    pub fn apply<R: ReportRow>(&self, base: &RenderOptions) -> RenderOptions {
        let headers = R::headers();
        let mut options = base.clone();
        if options.merge.is_empty() {
            options.merge = headers
                .iter()
                .take(self.merge_leading)
                .map(|h| h.to_string())
                .collect();
        }
        let hides_document = !self.documents
            && headers.contains(&DOCUMENT_COLUMN)
            && !options.ignore.iter().any(|c| c.eq_ignore_ascii_case(DOCUMENT_COLUMN));
        if hides_document {
            options.ignore.push(DOCUMENT_COLUMN.to_string());
        }
        options
    }
}

pub fn present<R: ReportRow>(mut rows: Vec<R>, base: &RenderOptions, layout: Layout) -> Result<String> {
    sort_rows(&mut rows);
    log_info!("rendering {} row(s)", rows.len());
    render(&rows, &layout.apply::<R>(base))
}

/// Everything a subcommand needs to build its describer.
pub struct Session {
    pub config: DescribeConfig,
    pub sdk_config: SdkConfig,
    pub orchestrator: Orchestrator,
    pub render: RenderOptions,
}

impl Session {
    fn target_regions(&self, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.config.regions.clone()
        } else {
            requested.to_vec()
        }
    }

    fn ec2(&self, regions: &[String]) -> Ec2Describer {
        Ec2Describer::new(
            Arc::new(Ec2SdkClient::new(&self.sdk_config)),
            Arc::new(LoadBalancerSdkClient::new(&self.sdk_config)),
            self.orchestrator.clone(),
            self.target_regions(regions),
        )
    }

    fn iam(&self) -> IamDescriber {
        IamDescriber::new(Arc::new(IamSdkClient::new(&self.sdk_config)), self.orchestrator.clone())
    }

    fn s3(&self) -> S3Describer {
        S3Describer::new(Arc::new(S3SdkClient::new(&self.sdk_config)), self.orchestrator.clone())
    }
}

impl Cli {
    /// Flags win over file and environment settings.
    pub fn apply(&self, config: &mut DescribeConfig) {
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
        if let Some(region) = &self.region {
            config.default_region = region.clone();
        }
        if let Some(output) = self.output {
            config.output = output;
        }
    }

    pub fn render_options(&self, config: &DescribeConfig) -> RenderOptions {
        RenderOptions {
            format: config.output,
            header: !self.no_header,
            merge: self.merge.clone(),
            ignore: self.ignore.clone(),
        }
    }
}

pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let mut config = DescribeConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    log_info!(
        "default region {}, {} target region(s), output {}",
        config.default_region,
        config.regions.len(),
        config.output.as_str()
    );

    let sdk_config = config.load_sdk_config().await;
    let session = Session {
        orchestrator: Orchestrator::new(&config).with_parent_cancellation(&cancel),
        render: cli.render_options(&config),
        config,
        sdk_config,
    };
    let output = match cli.service {
        Service::Ec2 { command } => run_ec2(command, &session).await?,
        Service::Iam { command } => run_iam(command, &session).await?,
        Service::S3 { command } => run_s3(command, &session).await?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|_| stdout.flush())
        .context("cannot write output")
}

async fn run_ec2(command: Ec2Command, session: &Session) -> Result<String> {
    let render = &session.render;
    match command {
        Ec2Command::GetInstances { args, join } => {
            let describer = session.ec2(&args.regions);
            let query = args.query()?;
            match join {
                InstanceJoin::Default => present(describer.instances(&query).await?, render, Layout::default()),
                InstanceJoin::Sg => present(describer.instance_security_groups(&query).await?, render, Layout::default()),
                InstanceJoin::Route => present(describer.instance_routes(&query).await?, render, Layout::default()),
                InstanceJoin::Storage => present(describer.instance_storage(&query).await?, render, Layout::default()),
                InstanceJoin::Backup => present(describer.instance_backups(&query).await?, render, Layout::merged(5)),
                InstanceJoin::Lb => present(describer.instance_load_balancers(&query).await?, render, Layout::default()),
            }
        }
        Ec2Command::GetImages { args, join } => {
            let describer = session.ec2(&args.regions);
            let query = args.query()?;
            match join {
                ImageJoin::Default => present(describer.images(&query).await?, render, Layout::default()),
                ImageJoin::Backup => present(describer.image_backups(&query).await?, render, Layout::default()),
            }
        }
        Ec2Command::GetSecurityGroups { args, join } => {
            let describer = session.ec2(&args.regions);
            let query = args.query()?;
            match join {
                SecurityGroupJoin::Default => present(describer.security_groups(&query).await?, render, Layout::default()),
                SecurityGroupJoin::Perms => present(
                    describer.security_group_permissions(&query).await?,
                    render,
                    Layout::merged(4),
                ),
            }
        }
        Ec2Command::GetVpcs { args, join } => {
            let describer = session.ec2(&args.regions);
            let query = args.query()?;
            match join {
                VpcJoin::Default => present(describer.vpcs(&query).await?, render, Layout::default()),
                VpcJoin::Attr => present(describer.vpc_attributes(&query).await?, render, Layout::default()),
                VpcJoin::Cidr => present(describer.vpc_cidrs(&query).await?, render, Layout::default()),
            }
        }
        Ec2Command::GetSubnets { args, join } => {
            let describer = session.ec2(&args.regions);
            let query = args.query()?;
            match join {
                SubnetJoin::Default => present(describer.subnets(&query).await?, render, Layout::default()),
                SubnetJoin::Route => present(describer.subnet_routes(&query).await?, render, Layout::default()),
            }
        }
        Ec2Command::GetRouteTables { args, join } => {
            let describer = session.ec2(&args.regions);
            let query = args.query()?;
            match join {
                RouteTableJoin::Default => present(describer.route_tables(&query).await?, render, Layout::default()),
                RouteTableJoin::Assoc => present(
                    describer.route_table_associations(&query).await?,
                    render,
                    Layout::default(),
                ),
            }
        }
    }
}

async fn run_iam(command: IamCommand, session: &Session) -> Result<String> {
    let render = &session.render;
    let describer = session.iam();
    match command {
        IamCommand::GetUsers { args, join } => {
            let (query, documents) = (args.query(), args.documents()?);
            let policies = Layout::merged(2).with_documents(args.document);
            match join {
                UserJoin::Default => present(describer.users(&query).await?, render, Layout::default()),
                UserJoin::Policy => present(describer.user_policies(&query, &documents).await?, render, policies),
                UserJoin::Group => present(describer.user_groups(&query).await?, render, Layout::merged(1)),
                UserJoin::Assoc => present(describer.user_associations(&query, &documents).await?, render, policies),
            }
        }
        IamCommand::GetGroups { args, join } => {
            let (query, documents) = (args.query(), args.documents()?);
            match join {
                GroupJoin::Default => present(describer.groups(&query).await?, render, Layout::default()),
                GroupJoin::Policy => present(
                    describer.group_policies(&query, &documents).await?,
                    render,
                    Layout::merged(2).with_documents(args.document),
                ),
            }
        }
        IamCommand::GetRoles { args, join } => {
            let (query, documents) = (args.query(), args.documents()?);
            match join {
                RoleJoin::Default => present(describer.roles(&query).await?, render, Layout::default()),
                RoleJoin::Policy => present(
                    describer.role_policies(&query, &documents).await?,
                    render,
                    Layout::merged(2).with_documents(args.document),
                ),
                RoleJoin::Assume => present(describer.role_assumptions(&query).await?, render, Layout::default()),
            }
        }
        IamCommand::GetPolicies { args, scope } => {
            let (query, documents) = (args.query(), args.documents()?);
            present(
                describer.policies(scope.into(), &query, &documents).await?,
                render,
                Layout::default().with_documents(args.document),
            )
        }
    }
}

async fn run_s3(command: S3Command, session: &Session) -> Result<String> {
    match command {
        S3Command::GetBuckets {
            regions,
            names,
            document,
            document_filter,
        } => {
            let documents = DocumentOptions::new(document, document_filter)?;
            let query = BucketQuery {
                names,
                regions: session.target_regions(&regions),
            };
            present(
                session.s3().buckets(&query, &documents).await?,
                &session.render,
                Layout::default().with_documents(document),
            )
        }
    }
}
